use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use catalog::config::Config;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub struct TestServer {
    pub addr: SocketAddr,
    pub uploads: PathBuf,
    _dir: TempDir,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn blob_count(&self) -> usize {
        std::fs::read_dir(&self.uploads).unwrap().count()
    }
}

pub async fn start() -> TestServer {
    let dir = TempDir::new().unwrap();
    let uploads = dir.path().join("uploads");

    let mut cfg = Config::default();
    cfg.database.url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("catalog.db").to_string_lossy()
    );
    cfg.blob.root = uploads.to_string_lossy().into_owned();

    let listener = TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(catalog::serve(cfg, listener, async move {
        let _ = rx.await;
    }));

    // Wait until serve has finished setup (blob root created) and is accepting requests.
    let ready_url = format!("http://{}{}", addr, catalog::path::RECORDINGS);
    let client = reqwest::Client::new();
    for _ in 0..200 {
        if let Ok(res) = client.get(&ready_url).send().await {
            if res.status().is_success() {
                break;
            }
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    TestServer {
        addr,
        uploads,
        _dir: dir,
        _shutdown: tx,
    }
}
