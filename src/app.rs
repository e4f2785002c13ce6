//! Main application module
//!
//! `App` owns the editor session and is the only place state changes. Front
//! ends feed it [`Message`]s; background work (debounce timers, file reads,
//! image probes, exports) reports back through the same channel, so
//! `update` always sees one message at a time.
//!
//! `update` spawns tokio tasks and must be called from within a runtime.

use crate::config::Config;
use crate::editor::apply_format;
use crate::error::{AppResult, ExportError, ExportResult};
use crate::file_handler;
use crate::markdown::{
    export_filename, snapshot, CmarkEngine, DocumentRenderer, ExportOptions, HttpImageFetcher,
    ImageFetcher, ImageRequest, ImageResolver, ImageState, MarkdownEngine, PdfRenderer,
    PreviewRenderer, RetryPolicy,
};
use crate::message::{
    EditorMessage, ExportMessage, FileMessage, Message, NotificationMessage, PreviewMessage,
};
use crate::state::{AppState, ExportStatus, Notification, Severity};
use crate::utils::Debouncer;

use chrono::{Local, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Message shown after a successful export
const EXPORT_SUCCESS_TEXT: &str = "PDF exported successfully!";

/// External collaborators of the pipeline
pub struct Services {
    pub engine: Arc<dyn MarkdownEngine>,
    pub fetcher: Arc<dyn ImageFetcher>,
    pub renderer: Arc<dyn DocumentRenderer>,
}

impl Services {
    /// pulldown-cmark, reqwest and pdf-writer backed services
    pub fn from_config(config: &Config) -> AppResult<Self> {
        Ok(Self {
            engine: Arc::new(CmarkEngine::with_limit(config.preview.max_document_bytes)),
            fetcher: Arc::new(HttpImageFetcher::new()?),
            renderer: Arc::new(PdfRenderer::new()),
        })
    }
}

/// The editor session controller
pub struct App {
    config: Config,
    state: AppState,
    renderer: PreviewRenderer,
    resolver: ImageResolver,
    document_renderer: Arc<dyn DocumentRenderer>,
    debouncer: Debouncer,
    tx: UnboundedSender<Message>,
}

impl App {
    /// Create the app and the receiving end of its message channel
    pub fn new(config: Config, services: Services) -> (Self, UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let renderer = PreviewRenderer::new(services.engine, config.preview.empty_placeholder.clone());
        let resolver = ImageResolver::new(services.fetcher, RetryPolicy::from_config(&config.images));
        let debouncer = Debouncer::new(Duration::from_millis(config.preview.debounce_ms));

        let mut state = AppState::new();
        state.preview.show(renderer.render(""));

        let app = Self {
            config,
            state,
            renderer,
            resolver,
            document_renderer: services.renderer,
            debouncer,
            tx,
        };
        (app, rx)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Process a single message
    pub fn update(&mut self, message: Message) {
        match message {
            Message::Editor(msg) => self.handle_editor_message(msg),
            Message::File(msg) => self.handle_file_message(msg),
            Message::Preview(msg) => self.handle_preview_message(msg),
            Message::Export(msg) => self.handle_export_message(msg),
            Message::Notification(msg) => self.handle_notification_message(msg),
        }
    }

    /// Feed messages from `rx` until `done` holds
    ///
    /// Returns false if the channel closed first.
    pub async fn run_until<F>(&mut self, rx: &mut UnboundedReceiver<Message>, done: F) -> bool
    where
        F: Fn(&App) -> bool,
    {
        while !done(&*self) {
            match rx.recv().await {
                Some(message) => self.update(message),
                None => return false,
            }
        }
        true
    }

    /// Notifications raised since the last call
    ///
    /// Front ends should drain this regularly; only the newest
    /// [`MAX_UNANNOUNCED`](crate::state::MAX_UNANNOUNCED) are kept.
    pub fn take_announcements(&mut self) -> Vec<Notification> {
        self.state.take_unannounced()
    }

    /// Handle editor-related messages
    fn handle_editor_message(&mut self, msg: EditorMessage) {
        match msg {
            EditorMessage::TextChanged(text) => {
                self.state.editor.set_text(&text);
                self.schedule_render();
            }

            EditorMessage::Select(selection) => {
                self.state.editor.select(selection);
            }

            EditorMessage::ApplyFormat(format) => {
                let selection = self.state.editor.selection;
                match apply_format(&mut self.state.editor.buffer, selection, format) {
                    Ok(cursor) => {
                        self.state.editor.selection = cursor;
                        self.render_preview();
                    }
                    Err(e) => {
                        log::warn!("Could not apply {} format: {}", format, e);
                        self.notify(e.to_string(), Severity::Error);
                    }
                }
            }
        }
    }

    /// Handle file-related messages
    fn handle_file_message(&mut self, msg: FileMessage) {
        match msg {
            FileMessage::Open(candidate) => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let msg = match file_handler::load_document(&candidate).await {
                        Ok(document) => FileMessage::Loaded {
                            path: candidate.path,
                            document,
                        },
                        Err(e) => FileMessage::LoadFailed(e),
                    };
                    let _ = tx.send(msg.into());
                });
            }

            FileMessage::Loaded { path, document } => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());

                self.state.editor.replace_text(&document.content);
                self.state.document_path = Some(path);
                self.render_preview();

                if document.lossy {
                    self.notify(
                        format!("Some characters in {} could not be decoded.", name),
                        Severity::Warning,
                    );
                }
                self.notify(format!("Loaded {}", name), Severity::Success);
            }

            FileMessage::LoadFailed(e) => {
                log::error!("Failed to load document: {}", e);
                self.notify(e.user_message(), Severity::Error);
            }

            FileMessage::Changed(path) => {
                log::debug!("{} changed on disk, reloading", path.display());
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let msg: Message = match file_handler::read_file(&path).await {
                        Ok(document) => EditorMessage::TextChanged(document.content).into(),
                        Err(e) => FileMessage::LoadFailed(e).into(),
                    };
                    let _ = tx.send(msg);
                });
            }
        }
    }

    /// Handle preview-related messages
    fn handle_preview_message(&mut self, msg: PreviewMessage) {
        match msg {
            PreviewMessage::Refresh => self.render_preview(),

            PreviewMessage::DebounceElapsed(generation) => {
                if self.debouncer.complete(generation) {
                    self.render_preview();
                } else {
                    log::trace!("Ignoring superseded debounce {}", generation);
                }
            }

            PreviewMessage::ImageResolved { cycle, index, state } => {
                if !self.state.preview.apply_image(cycle, index, state) {
                    return;
                }
                log::debug!("Image {} of render {} is {:?}", index, cycle, state);
                if state == ImageState::Fallback {
                    let src = self.state.preview.images()[index].src.clone();
                    self.notify(format!("Image not available: {}", src), Severity::Warning);
                }
            }
        }
    }

    /// Handle export-related messages
    fn handle_export_message(&mut self, msg: ExportMessage) {
        match msg {
            ExportMessage::Start => self.start_export(),

            ExportMessage::Finished(result) => {
                self.state.export = ExportStatus::Idle;
                match result {
                    Ok(path) => {
                        log::info!("Exported {}", path.display());
                        self.state.last_export = Some(path);
                        self.notify(EXPORT_SUCCESS_TEXT, Severity::Success);
                    }
                    Err(e) => {
                        log::error!("Export failed: {}", e);
                        self.notify(e.user_message(), Severity::Error);
                    }
                }
            }
        }
    }

    /// Handle notification-related messages
    fn handle_notification_message(&mut self, msg: NotificationMessage) {
        match msg {
            NotificationMessage::Dismiss(id) => {
                self.state.notifications.dismiss(id);
                let ttl = chrono::Duration::milliseconds(self.config.notifications.duration_ms as i64);
                self.state.notifications.prune_expired(Utc::now(), ttl);
            }
        }
    }

    /// Restart the quiet window; the render happens when it elapses
    fn schedule_render(&mut self) {
        let tx = self.tx.clone();
        self.debouncer.schedule(move |generation| {
            let _ = tx.send(PreviewMessage::DebounceElapsed(generation).into());
        });
    }

    /// Render the current text now and start resolving its images
    fn render_preview(&mut self) {
        self.debouncer.cancel();

        let rendered = self.renderer.render(&self.state.editor.text());
        let images = rendered.images().to_vec();

        self.state.render_count += 1;
        let cycle = self.state.preview.show(rendered);
        let base_dir = self.state.base_dir();

        for (index, image) in images.into_iter().enumerate() {
            let resolver = self.resolver.clone();
            let tx = self.tx.clone();
            let request = ImageRequest::new(image.src, base_dir.clone());
            tokio::spawn(async move {
                let state = resolver.resolve(request).await;
                let _ = tx.send(PreviewMessage::ImageResolved { cycle, index, state }.into());
            });
        }
    }

    fn start_export(&mut self) {
        if self.state.editor.buffer.is_blank() {
            self.notify(ExportError::EmptyDocument.user_message(), Severity::Warning);
            return;
        }
        if self.state.is_exporting() {
            self.notify(ExportError::Busy.user_message(), Severity::Info);
            return;
        }

        // Export what the preview would show once the pending edit lands
        if self.debouncer.is_pending() {
            self.render_preview();
        }

        let text = self.state.editor.text();
        let filename = export_filename(&text, Local::now().date_naive(), &self.config.export.default_name);
        let options = ExportOptions::from_config(&self.config.export, filename);
        let html = self.state.preview.rendered_html().to_string();
        let dir = self.export_dir();

        log::info!("Exporting {} to {}", options.filename, dir.display());
        self.state.export = ExportStatus::Busy { since: Utc::now() };

        let renderer = self.document_renderer.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = run_export(renderer, html, options, dir).await;
            let _ = tx.send(ExportMessage::Finished(result).into());
        });
    }

    /// Configured output directory, else the document's, else the working directory
    fn export_dir(&self) -> PathBuf {
        self.config
            .export
            .output_dir
            .clone()
            .or_else(|| self.state.base_dir())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn notify(&mut self, message: impl Into<String>, severity: Severity) {
        let notification = self.state.notifications.push(message, severity);
        let id = notification.id;
        self.state.announce(notification);

        let tx = self.tx.clone();
        let duration = Duration::from_millis(self.config.notifications.duration_ms);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = tx.send(NotificationMessage::Dismiss(id).into());
        });
    }
}

/// Snapshot and lay out on a blocking worker, then save
async fn run_export(
    renderer: Arc<dyn DocumentRenderer>,
    html: String,
    options: ExportOptions,
    dir: PathBuf,
) -> ExportResult<PathBuf> {
    let path = dir.join(&options.filename);

    let bytes = tokio::task::spawn_blocking(move || {
        let snapshot = snapshot(&html, &options)?;
        renderer.render(&snapshot, &options)
    })
    .await
    .map_err(|e| ExportError::Task(e.to_string()))??;

    save_artifact(&dir, &path, &bytes).await?;
    Ok(path)
}

async fn save_artifact(dir: &Path, path: &Path, bytes: &[u8]) -> ExportResult<()> {
    file_handler::ensure_dir(dir).await?;
    file_handler::write_file_atomic(path, bytes).await?;
    log::debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadMode;
    use crate::editor::Format;
    use crate::file_handler::FileCandidate;
    use crate::error::{ImageError, ImageResult, RenderError, RenderResult};
    use crate::markdown::image::BoxFuture;
    use crate::markdown::Snapshot;
    use crate::state::Selection;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingEngine {
        calls: AtomicUsize,
        texts: Mutex<Vec<String>>,
    }

    impl MarkdownEngine for CountingEngine {
        fn to_html(&self, text: &str) -> RenderResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.texts.lock().unwrap().push(text.to_string());
            CmarkEngine::new().to_html(text)
        }
    }

    struct BrokenEngine;

    impl MarkdownEngine for BrokenEngine {
        fn to_html(&self, _text: &str) -> RenderResult<String> {
            Err(RenderError::Parser("unexpected end of input".to_string()))
        }
    }

    struct OfflineFetcher;

    impl ImageFetcher for OfflineFetcher {
        fn fetch<'a>(&'a self, _request: &'a ImageRequest, _mode: LoadMode) -> BoxFuture<'a, ImageResult<()>> {
            Box::pin(async { Err(ImageError::Network("offline".to_string())) })
        }
    }

    #[derive(Default)]
    struct FakeRenderer {
        calls: AtomicUsize,
        texts: Mutex<Vec<String>>,
    }

    impl DocumentRenderer for FakeRenderer {
        fn render(&self, snapshot: &Snapshot, _options: &ExportOptions) -> ExportResult<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.texts.lock().unwrap().push(snapshot.plain_text());
            Ok(b"%PDF-fake".to_vec())
        }
    }

    struct FailingRenderer;

    impl DocumentRenderer for FailingRenderer {
        fn render(&self, _snapshot: &Snapshot, _options: &ExportOptions) -> ExportResult<Vec<u8>> {
            Err(ExportError::Render("out of paper".to_string()))
        }
    }

    struct Harness {
        app: App,
        rx: UnboundedReceiver<Message>,
        engine: Arc<CountingEngine>,
        renderer: Arc<FakeRenderer>,
        dir: TempDir,
    }

    fn harness_with(engine: Option<Arc<dyn MarkdownEngine>>, renderer: Option<Arc<dyn DocumentRenderer>>) -> Harness {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.export.output_dir = Some(dir.path().join("out"));

        let counting = Arc::new(CountingEngine::default());
        let fake = Arc::new(FakeRenderer::default());
        let services = Services {
            engine: engine.unwrap_or_else(|| counting.clone() as Arc<dyn MarkdownEngine>),
            fetcher: Arc::new(OfflineFetcher),
            renderer: renderer.unwrap_or_else(|| fake.clone() as Arc<dyn DocumentRenderer>),
        };

        let (app, rx) = App::new(config, services);
        Harness {
            app,
            rx,
            engine: counting,
            renderer: fake,
            dir,
        }
    }

    fn harness() -> Harness {
        harness_with(None, None)
    }

    impl Harness {
        fn send(&mut self, message: impl Into<Message>) {
            self.app.update(message.into());
        }

        /// Process messages until `duration` of (virtual) time has passed
        async fn pump_for(&mut self, duration: Duration) {
            let deadline = tokio::time::Instant::now() + duration;
            loop {
                tokio::select! {
                    msg = self.rx.recv() => match msg {
                        Some(msg) => self.app.update(msg),
                        None => break,
                    },
                    _ = tokio::time::sleep_until(deadline) => break,
                }
            }
        }

        async fn wait_for<F: Fn(&App) -> bool>(&mut self, done: F) {
            assert!(self.app.run_until(&mut self.rx, done).await);
        }

        fn renders(&self) -> usize {
            self.engine.calls.load(Ordering::SeqCst)
        }

        fn latest(&self) -> (Severity, String) {
            let n = self.app.state().notifications.latest().expect("a notification");
            (n.severity, n.message.clone())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_preview_is_placeholder() {
        let h = harness();
        assert!(h.app.state().preview.rendered_html().contains("preview-placeholder"));
        assert_eq!(h.renders(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_render_once_with_final_text() {
        let mut h = harness();
        for text in ["#", "# H", "# He", "# Hello"] {
            h.send(EditorMessage::TextChanged(text.to_string()));
            tokio::time::advance(Duration::from_millis(50)).await;
        }
        assert_eq!(h.renders(), 0);

        h.pump_for(Duration::from_secs(1)).await;

        assert_eq!(h.renders(), 1);
        assert_eq!(h.engine.texts.lock().unwrap().as_slice(), ["# Hello"]);
        assert!(h.app.state().preview.rendered_html().contains("<h1>Hello</h1>"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spaced_edits_render_each() {
        let mut h = harness();
        h.send(EditorMessage::TextChanged("one".to_string()));
        h.pump_for(Duration::from_millis(500)).await;
        h.send(EditorMessage::TextChanged("two".to_string()));
        h.pump_for(Duration::from_millis(500)).await;

        assert_eq!(h.renders(), 2);
        assert_eq!(h.app.state().render_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toolbar_renders_immediately_and_cancels_debounce() {
        let mut h = harness();
        h.send(EditorMessage::TextChanged("say hi".to_string()));
        h.send(EditorMessage::Select(Selection::new(4, 6)));
        h.send(EditorMessage::ApplyFormat(Format::Bold));

        assert_eq!(h.app.state().editor.text(), "say **hi**");
        assert_eq!(h.app.state().editor.selection, Selection::collapsed(10));
        assert_eq!(h.renders(), 1);
        assert!(h.app.state().preview.rendered_html().contains("<strong>hi</strong>"));

        h.pump_for(Duration::from_secs(1)).await;
        assert_eq!(h.renders(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toolbar_on_empty_selection_inserts_placeholder() {
        let mut h = harness();
        h.send(EditorMessage::ApplyFormat(Format::Bold));
        assert_eq!(h.app.state().editor.text(), "**bold text**");
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_export_warns_without_rendering() {
        let mut h = harness();
        h.send(EditorMessage::TextChanged("  \n\t ".to_string()));
        h.send(ExportMessage::Start);

        assert!(!h.app.state().is_exporting());
        let (severity, message) = h.latest();
        assert_eq!(severity, Severity::Warning);
        assert!(message.contains("Markdown"));

        h.pump_for(Duration::from_millis(100)).await;
        assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_writes_named_pdf() {
        let mut h = harness();
        h.send(EditorMessage::TextChanged("# Hello World!\n\nBody text".to_string()));
        h.send(ExportMessage::Start);
        assert!(h.app.state().is_exporting());

        h.send(ExportMessage::Start);
        let (severity, message) = h.latest();
        assert_eq!(severity, Severity::Info);
        assert!(message.contains("already in progress"));

        h.wait_for(|app| !app.state().is_exporting()).await;

        let expected = h
            .dir
            .path()
            .join("out")
            .join(format!("hello-world-{}.pdf", Local::now().date_naive().format("%Y-%m-%d")));
        assert_eq!(h.app.state().last_export.as_deref(), Some(expected.as_path()));
        assert_eq!(std::fs::read(&expected).unwrap(), b"%PDF-fake");
        assert_eq!(h.latest(), (Severity::Success, EXPORT_SUCCESS_TEXT.to_string()));

        assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 1);
        assert!(h.renderer.texts.lock().unwrap()[0].contains("Body text"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_export_clears_busy() {
        let mut h = harness_with(None, Some(Arc::new(FailingRenderer)));
        h.send(EditorMessage::TextChanged("content".to_string()));
        h.send(ExportMessage::Start);
        h.wait_for(|app| !app.state().is_exporting()).await;

        let (severity, message) = h.latest();
        assert_eq!(severity, Severity::Error);
        assert!(message.starts_with("Error generating PDF"));
        assert!(message.contains("out of paper"));
        assert!(h.app.state().last_export.is_none());

        h.send(ExportMessage::Start);
        assert!(h.app.state().is_exporting());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_image_falls_back() {
        let mut h = harness();
        h.send(EditorMessage::TextChanged("![logo](missing.png)".to_string()));
        h.send(PreviewMessage::Refresh);
        assert_eq!(h.app.state().preview.images().len(), 1);

        h.wait_for(|app| app.state().preview.images_settled()).await;

        let html = h.app.state().preview.display_html();
        assert!(html.contains("Image not available: missing.png"));
        assert!(!html.contains("<img"));

        let (severity, message) = h.latest();
        assert_eq!(severity, Severity::Warning);
        assert!(message.contains("missing.png"));
        assert_eq!(h.app.state().notifications.active().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_engine_shows_error_block() {
        let mut h = harness_with(Some(Arc::new(BrokenEngine)), None);
        h.send(EditorMessage::TextChanged("*unclosed".to_string()));
        h.send(PreviewMessage::Refresh);

        let preview = h.app.state().preview.content();
        assert!(preview.is_error());
        assert!(preview.html().contains("Error rendering Markdown"));
        assert_eq!(h.app.state().editor.text(), "*unclosed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_file_replaces_text() {
        let mut h = harness();
        let path = h.dir.path().join("note.md");
        std::fs::write(&path, "# From disk").unwrap();

        h.send(EditorMessage::TextChanged("old".to_string()));
        h.send(FileMessage::Open(FileCandidate::from_path(&path)));
        h.wait_for(|app| app.state().notifications.latest().is_some()).await;

        assert_eq!(h.latest().0, Severity::Success);
        assert_eq!(h.app.state().editor.text(), "# From disk");
        assert_eq!(h.app.state().document_path.as_deref(), Some(path.as_path()));
        assert_eq!(h.renders(), 1);
        assert!(h.app.state().preview.rendered_html().contains("From disk"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_file_keeps_text() {
        let mut h = harness();
        let path = h.dir.path().join("photo.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        h.send(EditorMessage::TextChanged("keep me".to_string()));
        h.send(FileMessage::Open(FileCandidate::with_mime(&path, "image/png")));
        h.wait_for(|app| app.state().notifications.latest().is_some()).await;

        assert_eq!(h.latest().0, Severity::Error);
        assert_eq!(h.app.state().editor.text(), "keep me");
        assert!(h.app.state().document_path.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_file_keeps_text() {
        let mut h = harness();
        let path = h.dir.path().join("gone.md");

        h.send(EditorMessage::TextChanged("keep me".to_string()));
        h.send(FileMessage::Open(FileCandidate::from_path(&path)));
        h.wait_for(|app| app.state().notifications.latest().is_some()).await;

        assert_eq!(h.latest().0, Severity::Error);
        assert_eq!(h.app.state().editor.text(), "keep me");
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_change_goes_through_debounce() {
        let mut h = harness();
        let path = h.dir.path().join("live.md");
        std::fs::write(&path, "first").unwrap();

        h.send(FileMessage::Changed(path.clone()));
        h.wait_for(|app| app.state().render_count == 1).await;
        h.pump_for(Duration::from_secs(1)).await;

        assert_eq!(h.app.state().editor.text(), "first");
        assert_eq!(h.renders(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifications_auto_dismiss() {
        let mut h = harness();
        h.send(ExportMessage::Start);
        assert_eq!(h.app.state().notifications.active().len(), 1);
        assert_eq!(h.app.take_announcements().len(), 1);
        assert!(h.app.take_announcements().is_empty());

        let duration = h.app.config().notifications.duration_ms;
        h.pump_for(Duration::from_millis(duration + 100)).await;
        assert!(h.app.state().notifications.active().is_empty());
    }
}
