//! Tracing helpers for mesh operations.
//!
//! Initialize any `tracing` subscriber to see these events, e.g.
//!
//! ```rust,ignore
//! use tracing_subscriber::{fmt, prelude::*, EnvFilter};
//!
//! tracing_subscriber::registry()
//!     .with(fmt::layer())
//!     .with(EnvFilter::from_default_env())
//!     .init();
//! // RUST_LOG=mesh_kernel=debug,neuromesh=info
//! ```

use std::time::{Duration, Instant};

use tracing::{Span, debug, info};

use crate::Mesh;

/// Logs the duration of a named operation when dropped.
///
/// ```rust
/// use mesh_kernel::tracing_ext::OperationTimer;
///
/// let timer = OperationTimer::new("weld");
/// // ... work ...
/// let took = timer.finish();
/// assert!(took.as_secs() < 60);
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    span: Span,
    finished: bool,
}

impl OperationTimer {
    /// Start timing an operation.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!("mesh_operation", operation = name);
        debug!(target: "mesh_kernel::timing", operation = name, "Starting operation");
        Self {
            name,
            start: Instant::now(),
            span,
            finished: false,
        }
    }

    /// Start timing an operation on a mesh, recording its size.
    pub fn for_mesh(name: &'static str, mesh: &Mesh) -> Self {
        let span = tracing::info_span!(
            "mesh_operation",
            operation = name,
            faces = mesh.face_count(),
            vertices = mesh.vertex_count()
        );
        debug!(
            target: "mesh_kernel::timing",
            operation = name,
            faces = mesh.face_count(),
            vertices = mesh.vertex_count(),
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
            span,
            finished: false,
        }
    }

    /// Elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// The span covering this operation.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Stop the timer now and return the elapsed time.
    pub fn finish(mut self) -> Duration {
        let elapsed = self.start.elapsed();
        self.log(elapsed);
        self.finished = true;
        elapsed
    }

    fn log(&self, elapsed: Duration) {
        info!(
            target: "mesh_kernel::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", elapsed.as_secs_f64() * 1000.0),
            "Operation completed"
        );
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        if !self.finished {
            self.log(self.start.elapsed());
        }
    }
}

/// Log vertex/face counts and bounding box dimensions at debug level.
pub fn log_mesh_stats(mesh: &Mesh, context: &str) {
    let dims = mesh.extent();
    debug!(
        target: "mesh_kernel::mesh_state",
        context,
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        dimensions = format!("{:.2} x {:.2} x {:.2}", dims.x, dims.y, dims.z),
        "Mesh state"
    );
}

/// Log a before/after face count change at info level.
pub fn log_face_change(operation: &str, before: usize, after: usize) {
    let ratio = if before == 0 {
        1.0
    } else {
        after as f64 / before as f64
    };
    info!(
        target: "mesh_kernel::mesh_state",
        operation,
        before,
        after,
        ratio = format!("{:.3}", ratio),
        "Face count changed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_finish_returns_elapsed() {
        let timer = OperationTimer::new("noop");
        assert!(timer.elapsed_ms() >= 0.0);
        let took = timer.finish();
        assert!(took.as_secs_f64() >= 0.0);
    }

    #[test]
    fn test_logging_helpers_accept_empty_mesh() {
        let mesh = Mesh::new();
        let _timer = OperationTimer::for_mesh("empty", &mesh);
        log_mesh_stats(&mesh, "test");
        log_face_change("test", 0, 0);
    }
}
