//! Tests for the GitHub client against a local fake API.

use anyhow::{Context, Result, ensure};
use forksync::github::{GitHubClient, GitHubError, GitHubSettings, Token};
use forksync::repository::RepositoryName;
use rstest::{fixture, rstest};
use test_support::FakeGitHub;

const TOKEN: &str = "ghp_test_token";
const USER: &str = "octo-user";

#[fixture]
fn server() -> FakeGitHub {
    FakeGitHub::start(TOKEN).expect("start fake GitHub")
}

fn client_for(server: &FakeGitHub, token: &str) -> Result<GitHubClient> {
    let settings = GitHubSettings::new(&server.url(), USER, Token::new(token.to_owned()))?;
    Ok(GitHubClient::new(settings))
}

fn widgets() -> RepositoryName {
    RepositoryName::from_parts("acme", "widgets").expect("valid name")
}

#[rstest]
fn get_repository_decodes_document(server: FakeGitHub) -> Result<()> {
    server.add_repository("acme/widgets", "/srv/git/acme/widgets.git");
    let client = client_for(&server, TOKEN)?;
    let repo = client.get_repository(&widgets())?;
    ensure!(repo.full_name == "acme/widgets", "got {}", repo.full_name);
    ensure!(repo.owner.login == "acme", "owner should be decoded");
    ensure!(!repo.fork, "plain repository is not a fork");
    ensure!(
        repo.clone_url.as_deref() == Some("/srv/git/acme/widgets.git"),
        "clone URL should be decoded"
    );
    let requests = server.requests();
    let first = requests.first().context("request recorded")?;
    ensure!(first.method == "GET" && first.path == "/repos/acme/widgets");
    ensure!(first.header("authorization") == Some("Bearer ghp_test_token"));
    ensure!(
        first.header("accept") == Some("application/vnd.github+json"),
        "accept header: {:?}",
        first.header("accept")
    );
    ensure!(first.header("x-github-api-version") == Some("2022-11-28"));
    ensure!(
        first
            .header("user-agent")
            .is_some_and(|agent| agent.starts_with("forksync/")),
        "user agent: {:?}",
        first.header("user-agent")
    );
    Ok(())
}

#[rstest]
fn find_repository_maps_not_found_to_none(server: FakeGitHub) -> Result<()> {
    let client = client_for(&server, TOKEN)?;
    ensure!(client.find_repository(&widgets())?.is_none());
    Ok(())
}

#[rstest]
fn get_repository_reports_not_found(server: FakeGitHub) -> Result<()> {
    let client = client_for(&server, TOKEN)?;
    let err = client
        .get_repository(&widgets())
        .err()
        .context("missing repository should fail")?;
    ensure!(err.is_not_found(), "expected 404, got {err}");
    Ok(())
}

#[rstest]
fn bad_token_surfaces_status(server: FakeGitHub) -> Result<()> {
    server.add_repository("acme/widgets", "/srv/git/acme/widgets.git");
    let client = client_for(&server, "wrong")?;
    let err = client
        .find_repository(&widgets())
        .err()
        .context("unauthorised request should fail")?;
    ensure!(
        matches!(err, GitHubError::Status { status: 401, .. }),
        "unexpected {err:?}"
    );
    ensure!(
        !err.to_string().contains("wrong"),
        "token must not appear in errors: {err}"
    );
    Ok(())
}

#[rstest]
fn creates_fork_when_user_has_none(server: FakeGitHub) -> Result<()> {
    server.add_repository("acme/widgets", "/srv/git/acme/widgets.git");
    server.on_fork("acme/widgets", "octo-user/widgets", "/srv/git/octo-user/widgets.git");
    let client = client_for(&server, TOKEN)?;

    let fork = client.fork_repository_or_revert_master_in_fork(&widgets(), USER)?;
    ensure!(fork.full_name == "octo-user/widgets", "got {}", fork.full_name);
    ensure!(fork.fork, "created repository should be a fork");

    let requests = server.requests();
    let methods: Vec<_> = requests
        .iter()
        .map(|r| format!("{} {}", r.method, r.path))
        .collect();
    ensure!(
        methods == ["GET /repos/octo-user/widgets", "POST /repos/acme/widgets/forks"],
        "unexpected requests {methods:?}"
    );
    let post = requests.last().context("fork request recorded")?;
    let body: serde_json::Value = serde_json::from_str(&post.body)?;
    ensure!(body == serde_json::json!({}), "fork body: {}", post.body);
    ensure!(post.header("content-type") == Some("application/json"));
    Ok(())
}

#[rstest]
fn reuses_existing_fork(server: FakeGitHub) -> Result<()> {
    server.add_fork("octo-user/widgets", "/srv/git/octo-user/widgets.git", "acme/widgets");
    let client = client_for(&server, TOKEN)?;

    let fork = client.fork_repository_or_revert_master_in_fork(&widgets(), USER)?;
    ensure!(fork.full_name == "octo-user/widgets");
    ensure!(
        server.requests().iter().all(|r| r.method == "GET"),
        "an existing fork must not be re-created"
    );
    Ok(())
}

#[rstest]
fn unrelated_repository_with_same_name_is_rejected(server: FakeGitHub) -> Result<()> {
    server.add_repository("octo-user/widgets", "/srv/git/octo-user/widgets.git");
    let client = client_for(&server, TOKEN)?;

    let err = client
        .fork_repository_or_revert_master_in_fork(&widgets(), USER)
        .err()
        .context("name clash should fail")?;
    ensure!(
        matches!(err, GitHubError::NameTaken { .. }),
        "unexpected {err:?}"
    );
    Ok(())
}

#[rstest]
#[case("octo-user")]
#[case("Octo-User")]
fn forking_own_repository_is_rejected(server: FakeGitHub, #[case] owner: &str) -> Result<()> {
    let client = client_for(&server, TOKEN)?;
    let own = RepositoryName::from_parts(owner, "widgets")?;
    let err = client
        .fork_repository_or_revert_master_in_fork(&own, USER)
        .err()
        .context("own repository should fail")?;
    ensure!(
        matches!(err, GitHubError::OwnRepository { .. }),
        "unexpected {err:?}"
    );
    ensure!(server.requests().is_empty(), "no request should be sent");
    Ok(())
}
