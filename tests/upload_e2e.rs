use std::fs;

use uplink::credentials::AuthOptions;
use uplink::transfer::{UploadArgs, handle_upload};

// 连接不可达端口必须以连接错误结束，而不是挂起或崩溃
#[test]
fn test_upload_to_unreachable_host_fails_fast() {
    let ts = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0);
    let dir = std::env::temp_dir().join(format!("uplink_e2e_{}", ts));
    fs::create_dir_all(&dir).unwrap();
    let file = dir.join("payload.bin");
    fs::write(&file, vec![0u8; 1024]).unwrap();

    let args = UploadArgs {
        source: file,
        sftp_url: "sftp://tester:pw@127.0.0.1:65000/tmp/uplink_e2e".to_string(),
        auth: AuthOptions::default(),
        concurrency: Some(1),
        verbose: false,
        json: false,
        quiet: true,
    };
    let result = handle_upload(args);
    assert!(result.is_err(), "connect to a closed port must fail");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn test_upload_rejects_malformed_url_before_io() {
    let args = UploadArgs {
        source: std::env::temp_dir(),
        sftp_url: "sftp://tester@:22/tmp".to_string(),
        auth: AuthOptions::default(),
        concurrency: None,
        verbose: false,
        json: false,
        quiet: true,
    };
    assert!(handle_upload(args).is_err());
}

#[test]
fn test_upload_requires_some_credential() {
    let args = UploadArgs {
        source: std::env::temp_dir(),
        sftp_url: "sftp://tester@127.0.0.1:65000/tmp".to_string(),
        auth: AuthOptions::default(),
        concurrency: None,
        verbose: false,
        json: false,
        quiet: true,
    };
    // 进程环境未设 UPLINK_* 时必须在建连前报缺凭据
    let result = handle_upload(args);
    assert!(result.is_err());
}
