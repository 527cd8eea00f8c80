use mudlink::config::ClientConfig;
use mudlink::errors::ConfigError;
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_missing_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("mudlink.conf");

    let config = ClientConfig::load_from_file(&path).unwrap();
    assert_eq!(config.server.address, "imperian.com:23");
    assert_eq!(config.handlers.queue_capacity, 100);
    assert_eq!(config.handlers.system_queue_capacity, 1024);
    assert!(!path.exists());
}

#[test]
fn test_load_full_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("mudlink.conf");
    fs::write(
        &path,
        r#"
# my settings
[server]
address = "achaea.com:23"
network = "tcp4"   # force IPv4

[client]
name = "mudlink"
version = "1.2.3"
supports = "Char 1, Room 1,  , Comm.Channel 1"

[handlers]
queue_capacity = 8
system_queue_capacity = 64

[logging]
level = "telnet_gmcp=debug"
show_gmcp = true
"#,
    )
    .unwrap();

    let config = ClientConfig::load_from_file(&path).unwrap();
    assert_eq!(config.server.address, "achaea.com:23");
    assert_eq!(config.server.network, "tcp4");
    assert_eq!(config.client.version, "1.2.3");
    assert_eq!(
        config.client.supports,
        vec!["Char 1", "Room 1", "Comm.Channel 1"]
    );
    assert_eq!(config.handlers.queue_capacity, 8);
    assert_eq!(config.handlers.system_queue_capacity, 64);
    assert_eq!(config.logging.level, "telnet_gmcp=debug");
    assert!(config.logging.show_gmcp);

    let options = config.to_connection_options();
    assert_eq!(options.identity.name, "mudlink");
    assert_eq!(options.identity.version, "1.2.3");
    assert_eq!(options.identity.supports.len(), 3);
    assert_eq!(options.queue_capacity, 8);
    assert_eq!(options.system_queue_capacity, 64);
}

#[test]
fn test_rendered_config_parses_back() {
    let mut config = ClientConfig::default();
    config.server.address = "localhost:4000".to_string();
    config.client.supports = vec!["Char 1".to_string(), "IRE.Rift 1".to_string()];
    config.logging.show_gmcp = true;

    let parsed = ClientConfig::parse_config(&config.to_config_file_format()).unwrap();
    assert_eq!(parsed.server.address, "localhost:4000");
    assert_eq!(parsed.server.network, "tcp");
    assert_eq!(parsed.client.name, config.client.name);
    assert_eq!(parsed.client.supports, config.client.supports);
    assert_eq!(parsed.handlers.queue_capacity, config.handlers.queue_capacity);
    assert!(parsed.logging.show_gmcp);
}

#[test]
fn test_rejects_bad_input() {
    let cases = [
        ("[sound]\nvolume = 3\n", "Unknown section [sound]"),
        ("[server]\nport = 23\n", "Unknown key 'port'"),
        ("[server]\nnetwork = \"udp\"\n", "Invalid value for 'network': udp"),
        ("[handlers]\nqueue_capacity = 0\n", "Invalid value for 'queue_capacity': 0"),
        ("[handlers]\nqueue_capacity = lots\n", "Invalid value for 'queue_capacity': lots"),
        ("[logging]\nshow_gmcp = maybe\n", "Invalid value for 'show_gmcp': maybe"),
    ];

    for (content, message) in cases {
        let err = ClientConfig::parse_config(content).unwrap_err();
        assert_eq!(err.to_string(), message, "for {content:?}");
    }

    assert!(matches!(
        ClientConfig::parse_config("[client]\ncolour = blue\n"),
        Err(ConfigError::UnknownKey(key)) if key == "colour"
    ));
}

#[test]
fn test_unreadable_path_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    // A directory cannot be read as a file
    let err = ClientConfig::load_from_file(temp_dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}
