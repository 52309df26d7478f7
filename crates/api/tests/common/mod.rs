use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use photomesh_api::config::{PhotogrammetryConfig, ServerConfig};
use photomesh_api::router::build_app_router;
use photomesh_api::state::AppState;
use photomesh_core::process::executor::{ToolCommand, DEFAULT_MAX_CAPTURE_BYTES};
use photomesh_core::workspace::CleanupPolicy;

/// Boundary used by [`multipart_request`].
const BOUNDARY: &str = "photomesh-test-boundary";

// ---------------------------------------------------------------------------
// Stub tool scripts
// ---------------------------------------------------------------------------

/// Reconstruction stub that writes a mesh and texture where the real tool would.
///
/// Invoked as `<script> <config> --output <dir>`.
pub const MESHROOM_OK: &str = r#"out="$3"
mkdir -p "$out/Texturing"
printf 'v 0 0 0\n' > "$out/Texturing/texturedMesh.obj"
printf 'JPEGDATA' > "$out/Texturing/texture_1001.jpg"
echo "processed $1"
"#;

/// Reconstruction stub that exits cleanly without producing a mesh.
pub const MESHROOM_NO_MESH: &str = "echo 'nothing to do'\n";

/// Reconstruction stub that fails with diagnostics on stderr.
pub const MESHROOM_FAIL: &str = "echo 'fatal: SfM failed to converge' >&2\nexit 3\n";

/// Reconstruction stub that outlives any short timeout.
pub const MESHROOM_SLOW: &str = "exec sleep 10\n";

/// Converter stub, invoked as `<script> -i <mesh> -o <glb>`.
pub const OBJ2GLTF_OK: &str = "printf 'glTF' > \"$4\"\n";

/// Converter stub that writes a truncated file and then fails.
pub const OBJ2GLTF_PARTIAL: &str = "printf 'glT' > \"$4\"\nexit 1\n";

/// Reconstruction stub whose output overruns a small capture limit.
pub const MESHROOM_NOISY: &str = "head -c 65536 /dev/zero\n";

/// Converter stub that always fails.
pub const OBJ2GLTF_FAIL: &str = "echo 'conversion failed' >&2\nexit 1\n";

/// Write `body` to `<dir>/<name>.sh` and return a command running it via bash.
pub fn bash_tool(dir: &Path, name: &str, body: &str) -> ToolCommand {
    let path = dir.join(format!("{name}.sh"));
    std::fs::write(&path, format!("#!/bin/bash\n{body}")).unwrap();
    ToolCommand::new("bash").with_arg(path.to_string_lossy().into_owned())
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Everything a photogrammetry test needs: the router and where sessions land.
pub struct TestApp {
    pub app: Router,
    pub workspace_root: PathBuf,
    _dir: tempfile::TempDir,
}

/// Build a test `ServerConfig` around the given tool commands.
///
/// Workspaces go under `<dir>/temp`, which is not created up front.
pub fn test_config(
    dir: &Path,
    meshroom: ToolCommand,
    obj2gltf: ToolCommand,
    pipeline_timeout: Duration,
    cleanup: CleanupPolicy,
) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 60,
        max_upload_bytes: 16 * 1024 * 1024,
        photogrammetry: PhotogrammetryConfig {
            workspace_root: dir.join("temp"),
            meshroom,
            obj2gltf,
            pipeline_timeout,
            max_capture_bytes: DEFAULT_MAX_CAPTURE_BYTES,
            cleanup,
        },
    }
}

/// Build the full application router with stub tools.
///
/// Uses the shared [`build_app_router`] so tests exercise the production
/// middleware stack.
pub fn build_test_app_with(
    meshroom_script: &str,
    obj2gltf_script: &str,
    pipeline_timeout: Duration,
    cleanup: CleanupPolicy,
) -> TestApp {
    build_test_app_configured(meshroom_script, obj2gltf_script, |photogrammetry| {
        photogrammetry.pipeline_timeout = pipeline_timeout;
        photogrammetry.cleanup = cleanup;
    })
}

/// Like [`build_test_app_with`], letting the caller adjust any pipeline
/// setting before the app is built.
pub fn build_test_app_configured(
    meshroom_script: &str,
    obj2gltf_script: &str,
    configure: impl FnOnce(&mut PhotogrammetryConfig),
) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let meshroom = bash_tool(dir.path(), "meshroom", meshroom_script);
    let obj2gltf = bash_tool(dir.path(), "obj2gltf", obj2gltf_script);
    let mut config = test_config(
        dir.path(),
        meshroom,
        obj2gltf,
        Duration::from_secs(30),
        CleanupPolicy::Retain,
    );
    configure(&mut config.photogrammetry);
    let workspace_root = config.photogrammetry.workspace_root.clone();

    TestApp {
        app: build_app_router(AppState::new(config)),
        workspace_root,
        _dir: dir,
    }
}

/// Happy-path app: both tools succeed, workspaces are retained.
pub fn build_test_app() -> TestApp {
    build_test_app_with(
        MESHROOM_OK,
        OBJ2GLTF_OK,
        Duration::from_secs(30),
        CleanupPolicy::Retain,
    )
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// A single multipart form part.
pub struct Part {
    pub name: &'static str,
    pub file_name: Option<String>,
    pub data: Vec<u8>,
}

impl Part {
    pub fn photo(index: usize, data: Vec<u8>) -> Self {
        Self {
            name: "photos",
            file_name: Some(format!("IMG_{index:04}.jpg")),
            data,
        }
    }

    pub fn text(name: &'static str, value: &str) -> Self {
        Self {
            name,
            file_name: None,
            data: value.as_bytes().to_vec(),
        }
    }
}

/// Deterministic 1 KiB pseudo-photo, distinct per `seed`.
pub fn fake_photo(seed: u8) -> Vec<u8> {
    (0..1024u32)
        .map(|i| (i.wrapping_mul(7).wrapping_add(u32::from(seed) * 13) % 256) as u8)
        .collect()
}

/// `count` distinct fake photos as `photos` parts.
pub fn photo_parts(count: usize) -> Vec<Part> {
    (0..count)
        .map(|i| Part::photo(i, fake_photo(i as u8)))
        .collect()
}

/// Build a `multipart/form-data` POST request to `uri`.
pub fn multipart_request(uri: &str, parts: &[Part]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match &part.file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: image/jpeg\r\n\r\n",
                    part.name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name)
                    .as_bytes(),
            ),
        }
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// POST `parts` to the photogrammetry endpoint.
pub async fn post_photos(app: Router, parts: &[Part]) -> Response {
    app.oneshot(multipart_request("/api/photogrammetry", parts))
        .await
        .unwrap()
}

/// Send a GET request.
pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Session directories currently under `root` (none if `root` is missing).
pub fn session_dirs(root: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(root) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}
