use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use svnhub::core::config::EngineConfig;
use svnhub::core::engine::Engine;
use svnhub::core::error::SvnHubError;
use svnhub::providers::ProviderType;
use svnhub::svn::SvnError;
use tempfile::tempdir;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// Fixture with fake toolchain binaries: `svnadmin create` makes a plain
/// directory, `svn info` answers with a canned document.
fn fixture(root: &Path) -> Arc<Engine> {
    let passwd = root.join("passwd");
    fs::write(&passwd, "alice:x\nbob:x\ncarol:x\n# comment\n").unwrap();
    let authz = root.join("authz");
    fs::write(
        &authz,
        "[groups]\nteam = alice, bob, @ops\nops = carol\n\n[repo1:/trunk]\nalice = rw\n",
    )
    .unwrap();
    let repos = root.join("repos");
    fs::create_dir(&repos).unwrap();
    fs::create_dir(repos.join("repo1")).unwrap();
    fs::create_dir(repos.join("repo2")).unwrap();

    let svn = write_script(
        root,
        "svn",
        r#"cat <<'EOF'
<?xml version="1.0"?>
<info>
<entry kind="dir" path="repo1" revision="9">
<commit revision="8"><author>bob</author><date>2024-03-01T12:00:00Z</date></commit>
</entry>
</info>
EOF"#,
    );
    let svnadmin = write_script(
        root,
        "svnadmin",
        r#"case "$1" in
create) mkdir "$2" ;;
verify)
    printf '%s\n' "$@" > "$(dirname "$0")/svnadmin-argv"
    case "$3" in
    */corrupt) echo 'svnadmin: E160004: filesystem is corrupt' >&2; exit 1 ;;
    esac
    ;;
esac"#,
    );

    let config = EngineConfig::from_toml(&format!(
        r#"
        [common]
        svn_executable = "{svn}"
        svnadmin_executable = "{svnadmin}"
        parent_url = "file://{repos}"
        authz_file = "{authz}"

        [[providers.user]]
        id = "passwd"
        backend = "passwd"
        [providers.user.options]
        file = "{passwd}"

        [[providers.group]]
        id = "groups"
        backend = "authz"

        [[providers.usergroup]]
        id = "assoc"
        backend = "authz"
        for_users = ["passwd"]
        for_groups = ["passwd"]

        [[providers.repository]]
        id = "local"
        backend = "local"
        [providers.repository.options]
        parent_dir = "{repos}"
        "#,
        svn = svn.display(),
        svnadmin = svnadmin.display(),
        repos = repos.display(),
        authz = authz.display(),
        passwd = passwd.display(),
    ))
    .unwrap();
    Engine::new(config)
}

#[test]
fn passwd_users_are_listed_and_paged() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());
    let provider = engine.user_provider("passwd").unwrap();
    assert_eq!(provider.type_name(), ProviderType::User);

    let page = provider.users(0, 2).unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(page.has_more);
    assert_eq!(page.items[0].id, "alice");

    let rest = provider.users(2, 2).unwrap();
    assert_eq!(rest.items.len(), 1);
    assert!(!rest.has_more);

    assert!(provider.find_user("bob").unwrap().is_some());
    assert!(provider.find_user("mallory").unwrap().is_none());
}

#[test]
fn authz_groups_are_exposed_as_group_provider() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());
    let provider = engine.group_provider("groups").unwrap();

    let groups = provider.groups(0, 10).unwrap();
    let ids: Vec<&str> = groups.items.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(ids, ["team", "ops"]);
    assert!(provider.find_group("team").unwrap().is_some());
    assert!(provider.find_group("nope").unwrap().is_none());
}

#[test]
fn associator_maps_users_and_groups() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());
    let associator = engine.association_provider("assoc").unwrap();

    let groups = associator.groups_of_user("alice").unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id, "team");

    // Nested @ops stays a group reference, not a user.
    let users = associator.users_of_group("team").unwrap();
    let ids: Vec<&str> = users.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, ["alice", "bob"]);
}

#[test]
fn local_repositories_are_enumerated_and_found() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());
    let provider = engine.repository_provider("local").unwrap();

    assert!(provider.is_editable());
    assert_eq!(provider.type_name(), ProviderType::Repository);
    let list = provider.repositories(0, 10).unwrap();
    let names: Vec<&str> = list.items.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["repo1", "repo2"]);

    assert!(provider.find("repo1").unwrap().is_some());
    assert!(provider.find("repo3").unwrap().is_none());
}

#[test]
fn create_goes_through_the_management_adapter() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());
    let provider = engine.repository_provider("local").unwrap();

    let repo = provider.create("repo3", &Default::default()).unwrap();
    assert_eq!(repo.name, "repo3");
    assert!(tmp.path().join("repos").join("repo3").is_dir());

    let err = provider.create("repo3", &Default::default()).unwrap_err();
    assert!(matches!(err, SvnHubError::ValidationError(_)));
}

#[test]
fn repository_names_cannot_escape_the_parent_directory() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());
    let provider = engine.repository_provider("local").unwrap();

    for name in ["../evil", "a/b", "..", ""] {
        let err = provider.create(name, &Default::default()).unwrap_err();
        assert!(matches!(err, SvnHubError::ValidationError(_)), "{name}");
    }
}

#[test]
fn delete_removes_the_repository() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());
    let provider = engine.repository_provider("local").unwrap();

    provider.delete("repo2").unwrap();
    assert!(!tmp.path().join("repos").join("repo2").exists());
    assert!(matches!(
        provider.delete("repo2").unwrap_err(),
        SvnHubError::NotFound(_)
    ));
}

#[test]
fn verify_goes_through_the_management_adapter() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());
    let provider = engine.repository_provider("local").unwrap();

    provider.verify("repo1").unwrap();
    let argv = fs::read_to_string(tmp.path().join("svnadmin-argv")).unwrap();
    let target = tmp.path().join("repos").join("repo1");
    assert_eq!(
        argv.lines().collect::<Vec<_>>(),
        ["verify", "--quiet", target.to_str().unwrap()]
    );
}

#[test]
fn verify_failure_surfaces_the_tool_error() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());
    let provider = engine.repository_provider("local").unwrap();
    fs::create_dir(tmp.path().join("repos").join("corrupt")).unwrap();

    let err = provider.verify("corrupt").unwrap_err();
    assert!(matches!(err, SvnHubError::Svn(SvnError::Exit { code: 1, .. })));

    assert!(matches!(
        provider.verify("repo9").unwrap_err(),
        SvnHubError::NotFound(_)
    ));
}

#[test]
fn info_delegates_to_the_read_adapter() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());
    let provider = engine.repository_provider("local").unwrap();

    let entry = provider.info("repo1").unwrap().unwrap();
    assert_eq!(entry.name, "repo1");
    assert_eq!(entry.revision, 8);
    assert_eq!(entry.author, "bob");
}

#[test]
fn provider_authz_resolves_the_shared_handle() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());
    let provider = engine.repository_provider("local").unwrap();

    let via_provider = provider.authz("repo1").unwrap();
    let via_engine = engine.authz_file(None).unwrap();
    assert!(Arc::ptr_eq(&via_provider, &via_engine));
    assert_eq!(via_provider.read(|file| file.paths("repo1").len()), 1);
}
