use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::{fs, net::SocketAddr};

use ranchwatch_fleet_health::{routes, AppState, Preset, SnapshotSource};

const NOW: &str = "2025-09-15T12:00:00Z";

#[derive(Debug, Deserialize)]
struct Device {
    device_id: String,
    validity_pct: Option<f64>,
    device_ok: bool,
    connection_bucket: String,
    recently_communicated: bool,
}

#[derive(Debug, Deserialize)]
struct Ranch {
    ranch_id: String,
    device_count: usize,
    pct_ok: f64,
    ranch_ok: bool,
    failure_reason: Option<String>,
    non_ok_count: usize,
    non_ok_recently_communicated_count: usize,
    adjustment_applied: bool,
    pct_ok_adjusted: f64,
    ranch_ok_adjusted: bool,
}

#[derive(Debug, Deserialize)]
struct Summary {
    device_count: usize,
    ranch_count: usize,
    promoted_count: usize,
}

/// Ranch R1: 4 OK devices, 6 failing devices all heard from within 3 days.
/// Ranch R2: 3 failing devices, only 2 heard from recently.
/// R1 belongs to Agro Sur, R2 to Ganadera Norte.
/// One device has no ranch, one row repeats a device id.
fn snapshot_csv() -> String {
    // ---
    let mut rows = vec![
        "device_id,ranch_id,ranch_name,customer_name,expected_messages,valid_positions_count,last_message_at,gateway_all_online".to_string(),
    ];
    for i in 0..4 {
        rows.push(format!("r1-ok-{i},R1,North Pasture,Agro Sur,100,55,2025-09-15T10:00:00Z,true"));
    }
    for i in 0..6 {
        rows.push(format!("r1-bad-{i},R1,North Pasture,Agro Sur,100,20,2025-09-13T12:00:00Z,false"));
    }
    rows.push("r2-a,R2,River Flats,Ganadera Norte,48,5,2025-09-14T11:00:00Z,true".to_string());
    rows.push("r2-b,R2,River Flats,Ganadera Norte,48,5,2025-09-15T11:00:00Z,true".to_string());
    rows.push("r2-c,R2,River Flats,Ganadera Norte,0,0,,true".to_string());
    rows.push("loose,,,,100,90,2025-09-15T11:00:00Z,".to_string());
    rows.push("r2-a,R2,River Flats,Ganadera Norte,48,48,2025-09-15T11:00:00Z,true".to_string());
    rows.join("\n") + "\n"
}

async fn spawn_server() -> Result<(String, tempfile::TempDir)> {
    // ---
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("fleet_snapshot_2025-09-01_06-00.csv"), "device_id\nstale\n")?;
    fs::write(dir.path().join("fleet_snapshot_2025-09-15_06-00.csv"), snapshot_csv())?;

    let app = routes::router(AppState {
        source: SnapshotSource::CsvDir {
            dir: dir.path().to_path_buf(),
            prefix: "fleet_snapshot".to_string(),
        },
        default_profile: Preset::Dashboard.profile(),
    });

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    Ok((format!("http://{addr}"), dir))
}

#[tokio::test]
async fn ranches_endpoint_applies_grace_adjustment() -> Result<()> {
    // ---
    let (base, _dir) = spawn_server().await?;
    let url = format!("{base}/fleet/ranches?now={NOW}");

    let ranches: Vec<Ranch> = Client::new().get(&url).send().await?.json().await?;
    assert_eq!(ranches.len(), 2, "device without ranch must not form a ranch");

    let r1 = ranches.iter().find(|r| r.ranch_id == "R1").unwrap();
    assert_eq!(r1.device_count, 10);
    assert_eq!(r1.pct_ok, 40.0);
    assert!(!r1.ranch_ok);
    assert_eq!(r1.failure_reason.as_deref(), Some("below-threshold device OK ratio"));
    assert_eq!(r1.non_ok_recently_communicated_count, 6);
    assert!(r1.adjustment_applied);
    assert_eq!(r1.pct_ok_adjusted, 100.0);
    assert!(r1.ranch_ok_adjusted);

    let r2 = ranches.iter().find(|r| r.ranch_id == "R2").unwrap();
    assert_eq!(r2.device_count, 3, "duplicate device row must be skipped");
    assert_eq!(r2.non_ok_count, 3);
    assert_eq!(r2.non_ok_recently_communicated_count, 2);
    assert!(!r2.adjustment_applied);
    assert_eq!(r2.pct_ok_adjusted, r2.pct_ok);
    assert!(!r2.ranch_ok_adjusted);

    // Worst first
    assert_eq!(ranches[0].ranch_id, "R2");

    Ok(())
}

#[tokio::test]
async fn narrower_window_changes_the_view() -> Result<()> {
    // ---
    let (base, _dir) = spawn_server().await?;
    let url = format!("{base}/fleet/ranches?now={NOW}&grace_window_days=1");

    let ranches: Vec<Ranch> = Client::new().get(&url).send().await?.json().await?;
    let r1 = ranches.iter().find(|r| r.ranch_id == "R1").unwrap();
    assert!(!r1.adjustment_applied, "failing devices last spoke 2 days ago");
    assert!(!r1.ranch_ok_adjusted);

    Ok(())
}

#[tokio::test]
async fn devices_endpoint_classifies_each_device() -> Result<()> {
    // ---
    let (base, _dir) = spawn_server().await?;
    let url = format!("{base}/fleet/devices?now={NOW}&ranch_id=R2");

    let devices: Vec<Device> = Client::new().get(&url).send().await?.json().await?;
    assert_eq!(devices.len(), 3);

    let never = devices.iter().find(|d| d.device_id == "r2-c").unwrap();
    assert_eq!(never.validity_pct, None);
    assert!(!never.device_ok);
    assert_eq!(never.connection_bucket, "beyond 3 months");
    assert!(!never.recently_communicated);

    let a = devices.iter().find(|d| d.device_id == "r2-a").unwrap();
    assert_eq!(a.connection_bucket, "24–48h");
    assert_eq!(a.validity_pct, Some(10.42));

    Ok(())
}

#[tokio::test]
async fn summary_and_exports() -> Result<()> {
    // ---
    let (base, _dir) = spawn_server().await?;
    let client = Client::new();

    let summary: Summary = client
        .get(format!("{base}/fleet/summary?now={NOW}"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(summary.device_count, 14);
    assert_eq!(summary.ranch_count, 2);
    assert_eq!(summary.promoted_count, 1);

    let response = client
        .get(format!("{base}/fleet/export/ranches.csv?now={NOW}"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("ranch_status_base_vs_adjusted_3d.csv"), "{disposition}");
    let body = response.text().await?;
    assert_eq!(body.lines().count(), 3);
    assert!(body.starts_with("ranch_id,"));

    Ok(())
}

#[tokio::test]
async fn customer_parameter_scopes_every_view() -> Result<()> {
    // ---
    let (base, _dir) = spawn_server().await?;
    let client = Client::new();

    let summary: Summary = client
        .get(format!("{base}/fleet/summary"))
        .query(&[("now", NOW), ("customer", "Agro Sur")])
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(summary.device_count, 10);
    assert_eq!(summary.ranch_count, 1);
    assert_eq!(summary.promoted_count, 1);

    let ranches: Vec<Ranch> = client
        .get(format!("{base}/fleet/ranches"))
        .query(&[("now", NOW), ("customer", "Ganadera Norte")])
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(ranches.len(), 1);
    assert_eq!(ranches[0].ranch_id, "R2");
    assert!(!ranches[0].ranch_ok_adjusted);

    let devices: Vec<Device> = client
        .get(format!("{base}/fleet/devices"))
        .query(&[("now", NOW), ("customer", "Nobody")])
        .send()
        .await?
        .json()
        .await?;
    assert!(devices.is_empty());

    Ok(())
}

#[tokio::test]
async fn invalid_profile_is_a_bad_request() -> Result<()> {
    // ---
    let (base, _dir) = spawn_server().await?;
    let client = Client::new();

    for query in ["ok_device_threshold=120", "grace_window_days=0", "profile=weekly", "connection=soon"] {
        let response = client
            .get(format!("{base}/fleet/devices?{query}"))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{query}");
    }

    let health: serde_json::Value = client.get(format!("{base}/health")).send().await?.json().await?;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["source"], "csv");

    Ok(())
}
