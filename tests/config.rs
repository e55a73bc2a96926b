use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use facecap::config::FacecapConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "FACECAP_CONFIG",
        "FACECAP_SERVER_URL",
        "FACECAP_CAMERA_URL",
        "FACECAP_BATCH_SIZE",
        "FACECAP_INTERVAL_MS",
        "FACECAP_QUALITY",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = FacecapConfig::load().expect("load config");

    assert_eq!(cfg.server.url, "http://127.0.0.1:5000");
    assert_eq!(cfg.server.batch_timeout, Duration::from_secs(30));
    assert_eq!(cfg.server.probe_timeout, Duration::from_secs(10));
    assert_eq!(cfg.camera.url, "stub://front_camera");
    assert_eq!(cfg.camera.width, 640);
    assert_eq!(cfg.camera.height, 480);
    assert_eq!(cfg.capture.batch_size, 50);
    assert_eq!(cfg.capture.interval, Duration::from_millis(200));
    assert!((cfg.capture.quality - 0.8).abs() < f32::EPSILON);

    clear_env();
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "server": {
            "url": "http://verify.internal:8080",
            "batch_timeout_secs": 60,
            "probe_timeout_secs": 5
        },
        "camera": {
            "url": "http://camera-1:81/stream",
            "width": 800,
            "height": 600
        },
        "capture": {
            "batch_size": 30,
            "interval_ms": 100,
            "quality": 0.9
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("FACECAP_CONFIG", file.path());
    std::env::set_var("FACECAP_CAMERA_URL", "stub://bench_camera");
    std::env::set_var("FACECAP_BATCH_SIZE", "10");

    let cfg = FacecapConfig::load().expect("load config");

    assert_eq!(cfg.server.url, "http://verify.internal:8080");
    assert_eq!(cfg.server.batch_timeout, Duration::from_secs(60));
    assert_eq!(cfg.server.probe_timeout, Duration::from_secs(5));
    assert_eq!(cfg.camera.url, "stub://bench_camera");
    assert_eq!(cfg.camera.width, 800);
    assert_eq!(cfg.camera.height, 600);
    assert_eq!(cfg.capture.batch_size, 10);
    assert_eq!(cfg.capture.interval, Duration::from_millis(100));
    assert!((cfg.capture.quality - 0.9).abs() < f32::EPSILON);

    clear_env();
}

#[test]
fn rejects_non_numeric_batch_size() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("FACECAP_BATCH_SIZE", "fifty");
    assert!(FacecapConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_out_of_range_quality() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("FACECAP_QUALITY", "1.5");
    assert!(FacecapConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_zero_batch_size() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("FACECAP_BATCH_SIZE", "0");
    assert!(FacecapConfig::load().is_err());

    clear_env();
}
