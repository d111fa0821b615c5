use std::sync::Arc;

use portal_nav::catalog::{default_redirects, default_registry};
use portal_nav::{
    landing_page, EffectiveRole, LoadStrategy, NavigationGuard, Role, RouteEntry, Screen, Session,
    SessionFeed, Shell, ShellConfig, StaticViews,
};
use serde::Serialize;

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn resolve(
    config: &ShellConfig,
    path: &str,
    role: Option<Role>,
    json: bool,
) -> anyhow::Result<()> {
    let table = default_redirects(config)?;
    let role = role.map(EffectiveRole::from);
    let target = table.resolve(path, role);

    if json {
        return print_json(&serde_json::json!({
            "path": path,
            "role": role,
            "target": target,
        }));
    }
    match target {
        Some(target) => println!("{path} -> {target}"),
        None => println!("{path}: no redirect"),
    }
    Ok(())
}

pub fn landing(role: Role, json: bool) -> anyhow::Result<()> {
    let page = landing_page(EffectiveRole::from(role));
    if json {
        return print_json(&serde_json::json!({ "role": role, "landing": page }));
    }
    println!("{page}");
    Ok(())
}

/// Evaluate `path` through a shell with placeholder views.
pub async fn route(
    config: &ShellConfig,
    path: &str,
    role: Option<Role>,
    json: bool,
) -> anyhow::Result<()> {
    let guard = NavigationGuard::new(
        Arc::new(default_registry()?),
        Arc::new(default_redirects(config)?),
        Arc::new(StaticViews::placeholders()),
    )
    .with_config(config);
    let session = match role {
        Some(role) => Session::signed_in("navctl", role),
        None => Session::signed_out(),
    };
    let shell = Shell::new(Arc::new(SessionFeed::with_session(session)), guard);
    shell.preload().await;
    shell.navigate(path);
    let outcome = shell.settle().await;
    let state = shell.state();

    if json {
        return print_json(&serde_json::json!({ "state": state, "outcome": outcome }));
    }
    println!("State:     {state}");
    for hop in &outcome.redirected_from {
        println!("From:      {hop}");
    }
    println!("Location:  {}", outcome.location);
    println!("Screen:    {}", describe(&outcome.screen));
    Ok(())
}

fn describe(screen: &Screen) -> String {
    match screen {
        Screen::Loading => "loading".to_string(),
        Screen::SignIn => "sign-in".to_string(),
        Screen::Skeleton { view } => format!("skeleton ({view})"),
        Screen::View { view, params, .. } if params.is_empty() => format!("view {view}"),
        Screen::View { view, params, .. } => {
            let params: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("view {view} [{}]", params.join(", "))
        }
        Screen::Fault(fault) => format!("fault: {fault}"),
    }
}

pub fn tree(role: Option<Role>, json: bool) -> anyhow::Result<()> {
    let registry = default_registry()?;
    let roles = match role {
        Some(role) => vec![role],
        None => Role::ALL.to_vec(),
    };

    if json {
        let routes: serde_json::Map<String, serde_json::Value> = roles
            .iter()
            .map(|role| {
                let entries = serde_json::to_value(registry.routes(*role))?;
                Ok((role.to_string(), entries))
            })
            .collect::<Result<_, serde_json::Error>>()?;
        return print_json(&routes);
    }

    println!("{:12} {:52} {:28} {:8}", "ROLE", "PATTERN", "TARGET", "LOAD");
    for role in roles {
        for entry in registry.routes(role) {
            let (target, load) = target_of(entry);
            println!("{:12} {:52} {:28} {:8}", role.as_str(), entry.pattern, target, load);
        }
    }
    Ok(())
}

fn target_of(entry: &RouteEntry) -> (String, &'static str) {
    match (&entry.view, &entry.redirect) {
        (Some(view), _) => {
            let load = match view.load {
                LoadStrategy::Eager => "eager",
                LoadStrategy::Deferred => "deferred",
            };
            (view.id.to_string(), load)
        }
        (None, Some(to)) => (format!("-> {to}"), ""),
        (None, None) => ("-".to_string(), ""),
    }
}

#[derive(Serialize)]
struct CheckReport {
    rules: usize,
    routes: usize,
    redirects_checked: usize,
}

pub fn check(config: &ShellConfig, json: bool) -> anyhow::Result<()> {
    let registry = default_registry()?;
    let table = default_redirects(config)?;
    registry.check_redirects(&table)?;

    let roles: Vec<Option<EffectiveRole>> = std::iter::once(None)
        .chain(Role::ALL.into_iter().map(|r| Some(EffectiveRole::from(r))))
        .collect();
    // Building the table already rejected chains that do not settle.
    let mut redirects_checked = 0;
    for rule in table.rules() {
        let path = rule.sample_path();
        redirects_checked += roles
            .iter()
            .filter(|role| table.resolve(&path, **role).is_some())
            .count();
    }

    let report = CheckReport {
        rules: table.rules().len(),
        routes: Role::ALL.iter().map(|r| registry.routes(*r).len()).sum(),
        redirects_checked,
    };
    if json {
        return print_json(&report);
    }
    println!(
        "ok: {} rules, {} routes, {} redirects checked",
        report.rules, report.routes, report.redirects_checked
    );
    Ok(())
}
