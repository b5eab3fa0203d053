//! Artifact store against a throwaway HTTP server.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use cuprobe_core::{ArtifactId, BundleFetcher, OsFamily, Platform, ProvisionError, Version};
use cuprobe_runtime::ArtifactStore;
use flate2::Compression;
use flate2::write::GzEncoder;

/// Answer exactly one request and hand back its request line.
fn serve_once(status: &'static str, body: Vec<u8>) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let header = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        stream.write_all(header.as_bytes()).unwrap();
        stream.write_all(&body).unwrap();
        stream.flush().unwrap();
        String::from_utf8_lossy(&request)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    });
    (format!("http://{addr}/bundles"), handle)
}

fn toolkit_archive() -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));
    for (path, data) in [
        ("bin/nvcc", &b"#!/bin/sh\n"[..]),
        ("lib/libcudart.so.12", &b"\x7fELF\x02\x01\x01"[..]),
        ("nvvm/libdevice/libdevice.10.bc", &b"BC"[..]),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, path, data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

#[test]
fn test_download_unpacks_into_cache() {
    let dir = tempfile::tempdir().unwrap();
    let archive = toolkit_archive();
    let size = archive.len() as u64;
    let (url, server) = serve_once("200 OK", archive);

    let seen = Arc::new(AtomicU64::new(0));
    let progress = Arc::clone(&seen);
    let store = ArtifactStore::new(dir.path(), Platform::new(OsFamily::Linux))
        .with_base_url(Some(url))
        .with_progress(Box::new(move |_, downloaded, _| {
            progress.store(downloaded, Ordering::SeqCst);
        }));

    let id = ArtifactId::toolkit(Version::release_of(12, 4));
    let root = store.fetch(&id).unwrap();

    let request = server.join().unwrap();
    assert!(request.starts_with("GET /bundles/cuda-12.4-linux-"), "{request}");
    assert_eq!(root, dir.path().join("artifacts").join("cuda-12.4"));
    assert!(root.join("lib/libcudart.so.12").is_file());
    assert!(root.join("nvvm/libdevice/libdevice.10.bc").is_file());
    assert_eq!(seen.load(Ordering::SeqCst), size);

    // Second fetch is served from the cache; the server is gone.
    assert_eq!(store.fetch(&id).unwrap(), root);

    // No staging leftovers.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("artifacts"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_unpublished_bundle_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let (url, server) = serve_once("404 Not Found", Vec::new());
    let store =
        ArtifactStore::new(dir.path(), Platform::new(OsFamily::Linux)).with_base_url(Some(url));

    let err = store
        .fetch(&ArtifactId::toolkit(Version::release_of(10, 2)))
        .unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, ProvisionError::Unavailable { .. }), "{err}");
    assert!(!dir.path().join("artifacts/cuda-10.2").exists());
}

#[test]
fn test_corrupt_archive_is_an_extract_error() {
    let dir = tempfile::tempdir().unwrap();
    let (url, server) = serve_once("200 OK", b"this is not a tarball".to_vec());
    let store =
        ArtifactStore::new(dir.path(), Platform::new(OsFamily::Linux)).with_base_url(Some(url));

    let err = store
        .fetch(&ArtifactId::new("cudnn", Version::release_of(12, 4)))
        .unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, ProvisionError::Extract { .. }), "{err}");
    assert!(!dir.path().join("artifacts/cudnn-12.4").exists());
}
