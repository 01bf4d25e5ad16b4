//! Resolver passes against a real config file and a mock update endpoint.

use std::sync::Arc;
use std::time::Duration;

use dmlc_config::Settings;
use dmlc_resolver::{
    OVERRIDE_INVALID, PATH_NOT_VALID, Resolution, default_server_path, staged_path,
};
use dmlc_types::{Arch, Platform, ServerLocation, UpdatePreference};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{ConfigFixture, ScriptedPrompter, write_executable};

async fn endpoint() -> (MockServer, String) {
    let server = MockServer::start().await;
    let url = format!("{}/update.php", server.uri());
    (server, url)
}

#[tokio::test]
async fn first_install_records_consent_in_config() {
    let (server, url) = endpoint().await;
    Mock::given(method("GET"))
        .and(path("/update.php"))
        .and(query_param("platform", "linux"))
        .and(query_param("arch", "x64"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"#!/bin/sh\necho dm\n".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    let fx = ConfigFixture::new(&url, "");
    let prompter = Arc::new(ScriptedPrompter::choosing(&[Some(0)]));

    let location = fx.resolver(prompter.clone()).resolve().await.unwrap().unwrap();

    assert_eq!(
        location.path(),
        default_server_path(&fx.install_dir, Platform::Linux, Arch::X64)
    );
    assert!(dmlc_utils::is_executable(location.path()));
    assert_eq!(fx.settings().update_preference(), UpdatePreference::AlwaysUpdate);
    let text = fx.config_text();
    assert!(text.starts_with("# written by the test\n"));
    assert!(text.contains("auto_update = true"));
    assert!(prompter.messages().is_empty());
}

#[tokio::test]
async fn retired_endpoint_turns_updates_off() {
    let (server, url) = endpoint().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&server)
        .await;
    let fx = ConfigFixture::new(&url, "auto_update = true\n");
    let prompter = Arc::new(ScriptedPrompter::default());

    let resolved = fx.resolver(prompter.clone()).resolve().await.unwrap();

    assert!(resolved.is_none());
    assert_eq!(fx.settings().update_preference(), UpdatePreference::NeverUpdate);
    assert!(fx.config_text().contains("auto_update = false"));
    assert_eq!(
        prompter.messages(),
        vec!["Update endpoint removed, try updating the extension.".to_string()]
    );
}

#[tokio::test]
async fn invalid_override_is_fixed_by_editing_config() {
    let (_server, url) = endpoint().await;
    let fx = ConfigFixture::new(&url, "langserver_path = \"/nonexistent/dm-langserver\"\n");
    let fixed = fx.dir.path().join("tools").join("dm-langserver");
    write_executable(&fixed);

    let settings = fx.settings();
    let chosen = fixed.clone();
    let prompter = Arc::new(
        ScriptedPrompter::confirming(&[true])
            .on_open_settings(move || settings.set_langserver_path(&chosen).unwrap()),
    );

    let location = fx.resolver(prompter.clone()).resolve().await.unwrap().unwrap();

    assert_eq!(location.path(), fixed);
    assert_eq!(prompter.messages(), vec![OVERRIDE_INVALID.to_string()]);
}

#[tokio::test]
async fn override_edited_to_another_bad_path_asks_again() {
    let (_server, url) = endpoint().await;
    let fx = ConfigFixture::new(&url, "langserver_path = \"/nonexistent/dm-langserver\"\n");
    let settings = fx.settings();
    let prompter = Arc::new(
        ScriptedPrompter::confirming(&[true, false]).on_open_settings(move || {
            settings
                .set_langserver_path(std::path::Path::new("/still/missing"))
                .unwrap();
        }),
    );

    let resolved = fx.resolver(prompter.clone()).resolve().await.unwrap();

    assert!(resolved.is_none());
    assert_eq!(
        prompter.messages(),
        vec![OVERRIDE_INVALID.to_string(), PATH_NOT_VALID.to_string()]
    );
}

#[tokio::test]
async fn installed_server_is_used_without_network() {
    let (server, url) = endpoint().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(304))
        .expect(0)
        .mount(&server)
        .await;
    let fx = ConfigFixture::new(&url, "auto_update = false\n");
    let installed = default_server_path(&fx.install_dir, Platform::Linux, Arch::X64);
    write_executable(&installed);

    let location = fx
        .resolver(Arc::new(ScriptedPrompter::default()))
        .resolve()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(location.path(), installed);
}

#[tokio::test]
async fn refresh_outlives_the_pass_until_joined() {
    let (server, url) = endpoint().await;
    let fx = ConfigFixture::new(&url, "");
    let installed = default_server_path(&fx.install_dir, Platform::Linux, Arch::X64);
    write_executable(&installed);
    let hash = dmlc_utils::md5_file(&installed).unwrap();
    Mock::given(method("GET"))
        .and(query_param("hash", hash.as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_bytes(b"#!/bin/sh\necho new\n".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;
    // Refresh consent offers enable first.
    let prompter = Arc::new(ScriptedPrompter::choosing(&[Some(0)]));

    let mut handle = fx.resolver(prompter).spawn();
    let resolution = tokio::time::timeout(Duration::from_secs(5), handle.wait())
        .await
        .unwrap();
    assert_eq!(
        resolution,
        Resolution::Resolved(ServerLocation::new(installed.clone()))
    );

    tokio::time::timeout(Duration::from_secs(5), handle.background().join())
        .await
        .unwrap();

    assert!(fx.config_text().contains("auto_update = true"));
    assert_eq!(
        std::fs::read(staged_path(&installed)).unwrap(),
        b"#!/bin/sh\necho new\n"
    );
    assert_eq!(std::fs::read(&installed).unwrap(), b"#!/bin/sh\n");
}

#[tokio::test]
async fn refresh_with_current_binary_stages_nothing() {
    let (server, url) = endpoint().await;
    let fx = ConfigFixture::new(&url, "auto_update = true\n");
    let installed = default_server_path(&fx.install_dir, Platform::Linux, Arch::X64);
    write_executable(&installed);
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(304))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = fx.resolver(Arc::new(ScriptedPrompter::default()));
    let location = resolver.resolve().await.unwrap().unwrap();
    tokio::time::timeout(Duration::from_secs(5), resolver.background().join())
        .await
        .unwrap();

    assert_eq!(location.path(), installed);
    assert!(!staged_path(&installed).exists());
}
