//! Step definitions for forking scenarios.
//!
//! Upstream and fork repositories are bare git repositories in the
//! scenario's temp dir, served through the fake GitHub API. Steps build a
//! [`ForkWorkflow`] against that server and store its results in
//! [`TestWorld`].

use crate::bdd::fixtures::{RefCellOptionExt, TOKEN, TestWorld};
use anyhow::{Context, Result, ensure};
use camino::Utf8PathBuf;
use forksync::git::GitCommander;
use forksync::github::{GitHubClient, GitHubSettings, Token};
use forksync::repository::RepositoryName;
use forksync::workflow::{ForkCheckout, ForkWorkflow};
use rstest_bdd_macros::{given, then, when};
use test_support::{FakeGitHub, UpstreamFixture};

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn with_server<R>(world: &TestWorld, f: impl FnOnce(&FakeGitHub) -> R) -> Result<R> {
    world
        .server
        .with_ref(f)
        .context("fake GitHub server has not been started")
}

fn with_workflow<R>(world: &TestWorld, f: impl FnOnce(&ForkWorkflow) -> R) -> Result<R> {
    world
        .workflow
        .with_ref(f)
        .context("workflow has not been configured")
}

fn with_upstream<R>(world: &TestWorld, f: impl FnOnce(&UpstreamFixture) -> R) -> Result<R> {
    world
        .upstream
        .with_ref(f)
        .context("upstream repository has not been created")
}

/// Bare repository that plays the current user's fork on GitHub.
fn fork_remote_path(world: &TestWorld, repo: &RepositoryName) -> Result<Utf8PathBuf> {
    let user = world.current_user()?;
    Ok(world
        .root()?
        .join("remotes")
        .join(user)
        .join(format!("{}.git", repo.name())))
}

fn copy_upstream_to_fork(world: &TestWorld, repo: &RepositoryName) -> Result<Utf8PathBuf> {
    let dest = fork_remote_path(world, repo)?;
    let path = with_upstream(world, |upstream| upstream.fork_to(&dest))??;
    world.fork_remote.set(path.clone());
    Ok(path)
}

fn build_workflow(world: &TestWorld, api_url: &str) -> Result<ForkWorkflow> {
    let user = world.current_user()?;
    let settings = GitHubSettings::new(api_url, user, Token::new(String::from(TOKEN)))?;
    let git = GitCommander::new(world.root()?.join("work"));
    Ok(ForkWorkflow::new(GitHubClient::new(settings), git))
}

fn fork_requests(world: &TestWorld) -> Result<usize> {
    with_server(world, |server| {
        server
            .requests()
            .iter()
            .filter(|request| request.method == "POST" && request.path.ends_with("/forks"))
            .count()
    })
}

// ---------------------------------------------------------------------------
// Given
// ---------------------------------------------------------------------------

#[given("the current user is {user:string}")]
fn current_user(world: &TestWorld, user: &str) -> Result<()> {
    world.user.set(user.to_owned());
    Ok(())
}

#[given("the GitHub organisation repository {repo:string} has {count:u32} commits")]
fn organisation_repository(world: &TestWorld, repo: &str, count: u32) -> Result<()> {
    let repo = RepositoryName::parse(repo)?;
    let root = world.root()?;
    let upstream = UpstreamFixture::create(&root.join("remotes").join(repo.owner()), repo.name())?;
    for n in 1..=count {
        upstream.commit(&format!("upstream change {n}"))?;
    }

    let server = FakeGitHub::start(TOKEN).context("start fake GitHub")?;
    server.add_repository(&repo.full_name(), upstream.url());
    let workflow = build_workflow(world, &server.url())?;

    world.upstream.set_value(upstream);
    world.server.set_value(server);
    world.workflow.set_value(workflow);
    Ok(())
}

#[given("the current user has not forked {repo:string} yet")]
fn not_forked_yet(world: &TestWorld, repo: &str) -> Result<()> {
    let repo = RepositoryName::parse(repo)?;
    let fork = copy_upstream_to_fork(world, &repo)?;
    let fork_name = repo.with_owner(&world.current_user()?)?;
    with_server(world, |server| {
        server.on_fork(&repo.full_name(), &fork_name.full_name(), fork.as_str());
    })
}

#[given("the current user already has a fork of {repo:string} that is {behind:u32} commits behind")]
fn stale_fork(world: &TestWorld, repo: &str, behind: u32) -> Result<()> {
    let repo = RepositoryName::parse(repo)?;
    let fork = copy_upstream_to_fork(world, &repo)?;
    for n in 1..=behind {
        with_upstream(world, |upstream| upstream.commit(&format!("missed change {n}")))??;
    }
    let fork_name = repo.with_owner(&world.current_user()?)?;
    with_server(world, |server| {
        server.add_fork(&fork_name.full_name(), fork.as_str(), &repo.full_name());
    })
}

#[given("the current user owns an unrelated repository named {name:string}")]
fn unrelated_repository(world: &TestWorld, name: &str) -> Result<()> {
    let full_name = format!("{}/{name}", world.current_user()?);
    let clone_url = world.root()?.join("remotes/unrelated.git");
    with_server(world, |server| {
        server.add_repository(&full_name, clone_url.as_str());
    })
}

#[given("there is no fork of {repo:string}")]
fn no_fork(world: &TestWorld, repo: &str) -> Result<()> {
    let repo = RepositoryName::parse(repo)?;
    with_workflow(world, |workflow| workflow.prepare_clean(&repo))?
}

// ---------------------------------------------------------------------------
// When
// ---------------------------------------------------------------------------

#[when("I fork the {repo:string} GitHub organisation to the current user")]
fn fork_to_current_user(world: &TestWorld, repo: &str) -> Result<()> {
    let repo = RepositoryName::parse(repo)?;
    let checkout = with_workflow(world, |workflow| workflow.fork_and_reset(&repo))??;
    world.checkout.set_value(checkout);
    Ok(())
}

#[when("I try to fork the {repo:string} GitHub organisation to the current user")]
fn try_fork_to_current_user(world: &TestWorld, repo: &str) -> Result<()> {
    let repo = RepositoryName::parse(repo)?;
    match with_workflow(world, |workflow| workflow.fork_and_reset(&repo))? {
        Ok(checkout) => world.checkout.set_value(checkout),
        Err(err) => world.fork_error.set(format!("{err:#}")),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Then
// ---------------------------------------------------------------------------

#[then(
    "there should be a fork for the current user which has the same last commit as {repo:string}"
)]
fn fork_has_same_last_commit(world: &TestWorld, repo: &str) -> Result<()> {
    let repo = RepositoryName::parse(repo)?;
    let expected: ForkCheckout = with_workflow(world, |workflow| workflow.checkout_for(&repo))??;
    let produced = world
        .checkout
        .with_ref(Clone::clone)
        .context("no fork has been checked out")?;
    ensure!(
        produced == expected,
        "checkouts {produced:?} are not where {expected:?} expects them"
    );
    let comparison =
        with_workflow(world, |workflow| workflow.verify_same_last_commit(&expected))??;
    let upstream_head = with_upstream(world, UpstreamFixture::head)??;
    ensure!(
        comparison.upstream_sha == upstream_head,
        "upstream checkout is at {} but upstream is at {upstream_head}",
        comparison.upstream_sha
    );
    Ok(())
}

#[then("the fork on GitHub has the same last commit as {repo:string}")]
fn remote_fork_matches_upstream(world: &TestWorld, repo: &str) -> Result<()> {
    let repo = RepositoryName::parse(repo)?;
    let fork = world.fork_remote.get().context("no fork remote recorded")?;
    ensure!(
        fork == fork_remote_path(world, &repo)?,
        "fork remote {fork} does not belong to {repo}"
    );
    let fork_head = test_support::git::bare_head(&fork)?;
    let upstream_head = with_upstream(world, UpstreamFixture::head)??;
    ensure!(
        fork_head == upstream_head,
        "fork on GitHub is at {fork_head}, upstream is at {upstream_head}"
    );
    Ok(())
}

#[then("GitHub was asked to create a fork")]
fn fork_was_requested(world: &TestWorld) -> Result<()> {
    let seen = fork_requests(world)?;
    ensure!(seen == 1, "expected one fork request, saw {seen}");
    Ok(())
}

#[then("GitHub was not asked to create a fork")]
fn fork_was_not_requested(world: &TestWorld) -> Result<()> {
    let seen = fork_requests(world)?;
    ensure!(seen == 0, "expected no fork request, saw {seen}");
    Ok(())
}

#[then("forking fails because {name:string} is already taken")]
fn forking_fails_name_taken(world: &TestWorld, name: &str) -> Result<()> {
    let error = world.fork_error.get().context("forking should have failed")?;
    let expected = format!("{name} exists but is not a fork of");
    ensure!(error.contains(&expected), "unexpected error: {error}");
    ensure!(
        !world.checkout.is_some(),
        "no checkout should be produced when forking fails"
    );
    Ok(())
}
