use std::fs;
use std::path::Path;
use std::sync::{Arc, Barrier};
use svnhub::core::authz::AuthzPathRule;
use svnhub::core::config::EngineConfig;
use svnhub::core::engine::Engine;
use svnhub::core::error::SvnHubError;
use svnhub::providers::ProviderType;
use tempfile::tempdir;

/// Standard fixture: a passwd file, an authz file with one group, a
/// repository parent directory, and two associators both fronting the
/// passwd provider for users (assoc1 declared first).
fn fixture(root: &Path) -> Arc<Engine> {
    let passwd = root.join("passwd");
    fs::write(&passwd, "alice:x\nbob:x\n").unwrap();
    let authz = root.join("authz");
    fs::write(&authz, "[groups]\nteam = alice, bob\n").unwrap();
    let repos = root.join("repos");
    fs::create_dir(&repos).unwrap();

    let config = EngineConfig::from_toml(&format!(
        r#"
        [common]
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
        id = "assoc1"
        backend = "authz"
        for_users = ["passwd"]

        [[providers.usergroup]]
        id = "assoc2"
        backend = "authz"
        for_users = ["passwd"]
        for_groups = ["passwd"]

        [[providers.repository]]
        id = "local"
        backend = "local"
        [providers.repository.options]
        parent_dir = "{repos}"
        "#,
        repos = repos.display(),
        authz = authz.display(),
        passwd = passwd.display(),
    ))
    .unwrap();
    Engine::new(config)
}

#[test]
fn provider_cache_returns_identical_instance() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());

    let first = engine.repository_provider("local").unwrap();
    let second = engine.repository_provider("local").unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let first = engine.user_provider("passwd").unwrap();
    let second = engine.user_provider("passwd").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn initialization_runs_once_per_cached_instance() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());

    engine.user_provider("passwd").unwrap();
    // The passwd provider's initialize hook verifies the file exists.
    // Removing the file afterwards must not matter: a cache hit re-runs
    // neither configuration lookup nor initialization.
    fs::remove_file(tmp.path().join("passwd")).unwrap();
    assert!(engine.user_provider("passwd").is_ok());
}

#[test]
fn unknown_provider_is_not_found_and_not_cached() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());

    for _ in 0..2 {
        let err = engine.repository_provider("missing").unwrap_err();
        match err {
            SvnHubError::UnknownProvider(type_name, id) => {
                assert_eq!(type_name, ProviderType::Repository);
                assert_eq!(id, "missing");
            }
            other => panic!("expected UnknownProvider, got {other}"),
        }
    }
}

#[test]
fn failed_initialization_is_not_cached_and_retries() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());
    fs::remove_file(tmp.path().join("passwd")).unwrap();

    let err = engine.user_provider("passwd").unwrap_err();
    assert!(matches!(err, SvnHubError::ProviderInit { .. }));

    // Repair the backing file; the next lookup must retry from scratch.
    fs::write(tmp.path().join("passwd"), "carol:x\n").unwrap();
    let provider = engine.user_provider("passwd").unwrap();
    assert_eq!(provider.users(0, 10).unwrap().items[0].id, "carol");
}

#[test]
fn known_providers_reads_configuration_only() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());

    let descriptors = engine.known_providers(ProviderType::UserGroupAssociation);
    let ids: Vec<&str> = descriptors.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["assoc1", "assoc2"]);
    assert!(engine.known_providers(ProviderType::Repository).len() == 1);
}

#[test]
fn associater_for_users_picks_first_declared_match() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());

    let associator = engine.associater_for_users("passwd").unwrap().unwrap();
    assert_eq!(associator.id(), "assoc1");

    let direct = engine.association_provider("assoc1").unwrap();
    assert!(Arc::ptr_eq(&associator, &direct));
}

#[test]
fn associater_for_groups_is_a_separate_concern() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());

    // Only assoc2 lists "passwd" under for_groups.
    let associator = engine.associater_for_groups("passwd").unwrap().unwrap();
    assert_eq!(associator.id(), "assoc2");
}

#[test]
fn associater_without_match_is_none() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());
    assert!(engine.associater_for_users("ldap").unwrap().is_none());
}

#[test]
fn authz_handles_are_shared_per_normalized_path() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());

    let first = engine.authz_file(None).unwrap();
    let second = engine.authz_file(None).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // An unnormalized spelling of the same path hits the same handle.
    let spelled = tmp.path().join("sub").join("..").join("authz");
    let third = engine.authz_file(Some(&spelled)).unwrap();
    assert!(Arc::ptr_eq(&first, &third));
}

#[test]
fn authz_mutations_are_visible_through_every_holder() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());

    let writer = engine.authz_file(None).unwrap();
    let reader = engine.authz_file(None).unwrap();
    writer
        .update(|file| {
            file.add_path(AuthzPathRule::new(Some("repo1"), "/trunk"));
            Ok(())
        })
        .unwrap();
    assert_eq!(reader.read(|file| file.paths("repo1").len()), 1);
}

#[test]
fn commit_failure_propagates_through_the_engine() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());

    let handle = engine.authz_file(None).unwrap();
    engine.commit_authz_file(&handle).unwrap();

    // A directory now sits where the file was, so the next write-back
    // cannot succeed.
    let authz = tmp.path().join("authz");
    fs::remove_file(&authz).unwrap();
    fs::create_dir(&authz).unwrap();
    assert!(matches!(
        engine.commit_authz_file(&handle).unwrap_err(),
        SvnHubError::CommitError { .. }
    ));
}

#[test]
fn failed_authz_load_is_not_cached() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());
    let missing = tmp.path().join("other-authz");

    assert!(engine.authz_file(Some(&missing)).is_err());

    fs::write(&missing, "[groups]\nops = carol\n").unwrap();
    let handle = engine.authz_file(Some(&missing)).unwrap();
    assert_eq!(handle.read(|file| file.groups().len()), 1);
}

#[test]
fn adapters_are_lazy_singletons() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());

    assert!(Arc::ptr_eq(
        &engine.svn_client().unwrap(),
        &engine.svn_client().unwrap()
    ));
    assert!(Arc::ptr_eq(
        &engine.svn_admin().unwrap(),
        &engine.svn_admin().unwrap()
    ));
}

#[test]
fn concurrent_lookups_construct_one_instance() {
    let tmp = tempdir().unwrap();
    let engine = fixture(tmp.path());

    let barrier = Arc::new(Barrier::new(8));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        handles.push(std::thread::spawn(move || {
            barrier.wait();
            engine.repository_provider("local").unwrap()
        }));
    }
    let providers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for provider in &providers[1..] {
        assert!(Arc::ptr_eq(&providers[0], provider));
    }
}
