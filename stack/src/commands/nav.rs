//! Navigation commands: moving the checkout around a tracked stack, and
//! printing it.

use stack_git::GitDriver;
use stack_graph::BranchGraph;

use crate::context::Session;
use crate::error::Error;

fn current_branch(driver: &GitDriver) -> Result<String, Error> {
    driver
        .current_branch()
        .map(|b| b.to_string())
        .map_err(|_| Error::DetachedHead)
}

pub fn up(driver: &GitDriver, pick: Option<usize>) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let name = current_branch(driver)?;
    session.require_tracked(&name)?;

    let graph = BranchGraph::load(&session.store)?;
    let children = graph.list_above(&name);
    let target = match children.len() {
        0 => return Err(Error::Invalid(format!("{name:?} has no branch above it"))),
        1 => children[0],
        _ => {
            let index = pick.ok_or_else(|| {
                let names: Vec<&str> = children.iter().map(|b| b.name.as_str()).collect();
                Error::Invalid(format!(
                    "{name:?} has more than one branch above it ({names:?}); pass --pick"
                ))
            })?;
            children.get(index).copied().ok_or_else(|| {
                Error::Invalid(format!("no branch above {name:?} at index {index}"))
            })?
        }
    };

    driver.checkout(&target.name)?;
    println!("{}", target.name);
    Ok(())
}

pub fn down(driver: &GitDriver) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let name = current_branch(driver)?;
    let branch = session.require_tracked(&name)?;
    let target = branch.base.unwrap_or_else(|| session.trunk.clone());
    driver.checkout(&target)?;
    println!("{target}");
    Ok(())
}

pub fn top(driver: &GitDriver) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let name = current_branch(driver)?;
    session.require_tracked(&name)?;

    let graph = BranchGraph::load(&session.store)?;
    let target = graph
        .list_upstack(&name)
        .last()
        .map(|b| b.name.clone())
        .unwrap_or(name);
    driver.checkout(&target)?;
    println!("{target}");
    Ok(())
}

pub fn bottom(driver: &GitDriver) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let name = current_branch(driver)?;
    let graph = BranchGraph::load(&session.store)?;
    let target = graph.find_bottom(&name)?.name.clone();
    driver.checkout(&target)?;
    println!("{target}");
    Ok(())
}

pub fn trunk(driver: &GitDriver) -> Result<(), Error> {
    let session = Session::open(driver)?;
    driver.checkout(&session.trunk)?;
    println!("{}", session.trunk);
    Ok(())
}

pub fn log(driver: &GitDriver) -> Result<(), Error> {
    let session = Session::open(driver)?;
    let current = driver.current_branch().ok().map(|b| b.to_string());
    let graph = BranchGraph::load(&session.store)?;

    let roots: Vec<&stack_store::TrackedBranch> = {
        let mut roots: Vec<&stack_store::TrackedBranch> =
            graph.branches().filter(|b| b.base.is_none()).collect();
        roots.sort_by(|a, b| a.name.cmp(&b.name));
        roots
    };
    if roots.is_empty() {
        println!("No tracked branches. Run `stack branch track` to start one.");
        return Ok(());
    }

    for root in roots {
        print_branch(
            driver,
            &session.store,
            &graph,
            &session.trunk,
            root,
            0,
            current.as_deref(),
        );
    }
    Ok(())
}

fn print_branch(
    driver: &GitDriver,
    store: &stack_store::MetadataStore,
    graph: &BranchGraph,
    trunk: &str,
    branch: &stack_store::TrackedBranch,
    depth: usize,
    current: Option<&str>,
) {
    let indent = "  ".repeat(depth);
    let marker = if Some(branch.name.as_str()) == current {
        " ◀"
    } else {
        ""
    };
    let status = match graph.check_restacked(driver, store, trunk, &branch.name) {
        Ok(stack_graph::RestackStatus::UpToDate) => "",
        Ok(stack_graph::RestackStatus::NeedsRestack) => " (needs restack)",
        Err(_) => "",
    };
    println!("{indent}- {}{status}{marker}", branch.name);
    for child in graph.list_above(&branch.name) {
        print_branch(driver, store, graph, trunk, child, depth + 1, current);
    }
}

pub fn info(driver: &GitDriver) -> Result<(), Error> {
    let session = Session::open(driver)?;
    println!("Trunk:  {}", session.trunk);
    println!("Remote: {}", session.remote);
    let graph = BranchGraph::load(&session.store)?;
    println!("Tracked branches: {}", graph.branches().count());
    Ok(())
}
