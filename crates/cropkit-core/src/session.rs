//! The crop session: the adapter between a selection widget, a manipulation
//! engine and the caller's callbacks.
//!
//! A session holds the latest [`CropSelection`] and an in-progress flag. The
//! host forwards three kinds of events to it:
//!
//! - [`CropSession::report_selection`] when the selection widget reports
//! - [`CropSession::confirm`] when the confirm control is pressed
//! - [`CropSession::cancel`] when the cancel control is pressed
//!
//! and redraws from [`CropSession::render`] afterwards.
//!
//! # Concurrency
//!
//! Sessions are single-threaded. A [`CropSession`] is a cheap handle over
//! shared state, so the host can keep dispatching events while a confirm is
//! suspended on the engine. No state borrow is held across that suspension.
//!
//! # Teardown
//!
//! After [`CropSession::unmount`] every event is ignored, and an engine call
//! that resolves late neither touches state nor invokes a callback.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{Control, DiagnosticEvent, DiagnosticSink, IgnoreReason, LogSink};
use crate::encode::SaveOptions;
use crate::engine::{
    ManipulateError, ManipulateFuture, ManipulateRequest, ManipulateResult, ManipulationEngine,
};
use crate::selection::{AspectRatio, CropSelection, CropShape};
use crate::style::{Style, StyleOverrides};

pub const CANCEL_LABEL: &str = "Cancel";
pub const CONFIRM_LABEL: &str = "Crop";
pub const CONFIRM_BUSY_LABEL: &str = "Cropping...";

/// Receives the output location of a successful crop.
pub type CropCallback = Box<dyn FnMut(String)>;
pub type CancelCallback = Box<dyn FnMut()>;

/// The serializable part of a session's configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropSessionConfig {
    /// Source image reference, handed to the widget and the engine unchanged.
    pub image_uri: String,
    #[serde(default)]
    pub aspect: AspectRatio,
    #[serde(default)]
    pub style: StyleOverrides,
    #[serde(default)]
    pub save: SaveOptions,
}

impl CropSessionConfig {
    pub fn new(image_uri: impl Into<String>) -> Self {
        Self {
            image_uri: image_uri.into(),
            ..Default::default()
        }
    }
}

/// Everything needed to mount a session.
pub struct CropSessionProps {
    pub config: CropSessionConfig,
    pub on_crop: Option<CropCallback>,
    pub on_cancel: Option<CancelCallback>,
    pub sink: Rc<dyn DiagnosticSink>,
}

impl CropSessionProps {
    pub fn new(image_uri: impl Into<String>) -> Self {
        Self::from_config(CropSessionConfig::new(image_uri))
    }

    pub fn from_config(config: CropSessionConfig) -> Self {
        Self {
            config,
            on_crop: None,
            on_cancel: None,
            sink: Rc::new(LogSink),
        }
    }

    pub fn aspect(mut self, aspect: AspectRatio) -> Self {
        self.config.aspect = aspect;
        self
    }

    pub fn style(mut self, style: StyleOverrides) -> Self {
        self.config.style = style;
        self
    }

    pub fn save(mut self, save: SaveOptions) -> Self {
        self.config.save = save;
        self
    }

    pub fn on_crop(mut self, callback: impl FnMut(String) + 'static) -> Self {
        self.on_crop = Some(Box::new(callback));
        self
    }

    pub fn on_cancel(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_cancel = Some(Box::new(callback));
        self
    }

    pub fn sink(mut self, sink: Rc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }
}

/// Result of one confirm press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// The press was dropped; nothing changed.
    Ignored(IgnoreReason),
    /// The engine produced an image at this location.
    Cropped(String),
    /// The engine rejected the request; the message was logged.
    Failed(String),
    /// The engine finished after the session was unmounted.
    Discarded,
}

/// What the host should draw: one selection widget, then two controls in a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropView {
    pub style: Style,
    pub widget: SelectionWidgetConfig,
    pub layout: Layout,
    /// Cancel first, confirm second.
    pub controls: [ActionControl; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionWidgetConfig {
    pub image_uri: String,
    pub aspect: AspectRatio,
    pub shape: CropShape,
    pub width: f32,
    pub height: f32,
    pub margin_bottom: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "direction", rename_all = "lowercase")]
pub enum Layout {
    Row { gap: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionControl {
    pub control: Control,
    pub label: String,
    pub enabled: bool,
    pub background: String,
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    selection: Option<CropSelection>,
    in_progress: bool,
    unmounted: bool,
    /// Bumped by every confirm and by unmount; a completion only applies if
    /// the generation it started under is still current.
    generation: u64,
}

struct Inner<E> {
    config: CropSessionConfig,
    style: Style,
    engine: E,
    sink: Rc<dyn DiagnosticSink>,
    state: RefCell<SessionState>,
    on_crop: RefCell<Option<CropCallback>>,
    on_cancel: RefCell<Option<CancelCallback>>,
}

/// Handle to a mounted crop session.
pub struct CropSession<E> {
    inner: Rc<Inner<E>>,
}

impl<E> Clone for CropSession<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: ManipulationEngine + 'static> CropSession<E> {
    /// Mount a session.
    pub fn new(props: CropSessionProps, engine: E) -> Self {
        let CropSessionProps {
            config,
            on_crop,
            on_cancel,
            sink,
        } = props;

        sink.emit(DiagnosticEvent::Mounted {
            image_uri: config.image_uri.clone(),
            has_on_crop: on_crop.is_some(),
            has_on_cancel: on_cancel.is_some(),
            aspect: config.aspect,
        });

        let style = Style::default().merge(&config.style);
        Self {
            inner: Rc::new(Inner {
                config,
                style,
                engine,
                sink,
                state: RefCell::new(SessionState::default()),
                on_crop: RefCell::new(on_crop),
                on_cancel: RefCell::new(on_cancel),
            }),
        }
    }

    /// Replace the held selection with the widget's latest report.
    ///
    /// Returns `false` if the session is unmounted.
    pub fn report_selection(&self, selection: CropSelection) -> bool {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.unmounted {
                return false;
            }
            state.selection = Some(selection);
        }
        self.inner.emit(DiagnosticEvent::SelectionUpdated(selection));
        true
    }

    /// Handle a confirm press.
    ///
    /// The in-progress flag is set and the engine is called before this
    /// returns; the returned future resolves once the engine does. Presses
    /// with no selection, during a crop, or after unmount are ignored.
    ///
    /// Dropping the returned future before it resolves abandons the crop:
    /// the in-progress flag is cleared and no callback runs.
    pub fn confirm(&self) -> impl Future<Output = ConfirmOutcome> + 'static {
        let started = self.inner.begin_confirm().map(|(generation, pending)| {
            let guard = PendingConfirm::new(&self.inner, generation);
            (guard, pending)
        });

        async move {
            let (guard, pending) = match started {
                Ok(started) => started,
                Err(reason) => return ConfirmOutcome::Ignored(reason),
            };
            let result = pending.await;
            guard.finish(result)
        }
    }

    /// Handle a cancel press. Returns `false` if the control was disabled.
    pub fn cancel(&self) -> bool {
        let blocked = {
            let state = self.inner.state.borrow();
            if state.unmounted {
                Some(IgnoreReason::Unmounted)
            } else if state.in_progress {
                Some(IgnoreReason::InProgress)
            } else {
                None
            }
        };

        if let Some(reason) = blocked {
            self.inner.emit(DiagnosticEvent::PressIgnored {
                control: Control::Cancel,
                reason,
            });
            return false;
        }

        self.inner.emit(DiagnosticEvent::CancelPressed);
        self.inner.invoke_on_cancel();
        true
    }

    /// Tear the session down. Idempotent.
    pub fn unmount(&self) {
        {
            let mut state = self.inner.state.borrow_mut();
            if state.unmounted {
                return;
            }
            state.unmounted = true;
            state.generation += 1;
            state.selection = None;
            state.in_progress = false;
        }
        self.inner.emit(DiagnosticEvent::Unmounted);
    }
}

impl<E> CropSession<E> {
    /// Describe the current view.
    pub fn render(&self) -> CropView {
        let style = &self.inner.style;
        let config = &self.inner.config;
        let in_progress = self.is_in_progress();
        let can_confirm = self.can_confirm();

        let cancel = ActionControl {
            control: Control::Cancel,
            label: CANCEL_LABEL.to_string(),
            enabled: self.can_cancel(),
            background: style.cancel_color.clone(),
        };
        let confirm = ActionControl {
            control: Control::Confirm,
            label: if in_progress {
                CONFIRM_BUSY_LABEL
            } else {
                CONFIRM_LABEL
            }
            .to_string(),
            enabled: can_confirm,
            background: if can_confirm {
                style.confirm_color.clone()
            } else {
                style.disabled_color.clone()
            },
        };

        CropView {
            style: style.clone(),
            widget: SelectionWidgetConfig {
                image_uri: config.image_uri.clone(),
                aspect: config.aspect,
                shape: CropShape::Rect,
                width: style.cropper_width,
                height: style.cropper_height,
                margin_bottom: style.cropper_margin_bottom,
            },
            layout: Layout::Row {
                gap: style.button_gap,
            },
            controls: [cancel, confirm],
        }
    }

    pub fn config(&self) -> &CropSessionConfig {
        &self.inner.config
    }

    pub fn image_uri(&self) -> &str {
        &self.inner.config.image_uri
    }

    pub fn engine(&self) -> &E {
        &self.inner.engine
    }

    pub fn selection(&self) -> Option<CropSelection> {
        self.inner.state.borrow().selection
    }

    pub fn is_in_progress(&self) -> bool {
        self.inner.state.borrow().in_progress
    }

    pub fn is_mounted(&self) -> bool {
        !self.inner.state.borrow().unmounted
    }

    /// Whether the confirm control is enabled.
    pub fn can_confirm(&self) -> bool {
        let state = self.inner.state.borrow();
        !state.unmounted && !state.in_progress && state.selection.is_some()
    }

    /// Whether the cancel control is enabled.
    pub fn can_cancel(&self) -> bool {
        let state = self.inner.state.borrow();
        !state.unmounted && !state.in_progress
    }
}

/// An engine call started by `confirm` that has not been applied yet.
struct PendingConfirm<E> {
    inner: Rc<Inner<E>>,
    generation: u64,
    finished: bool,
}

impl<E> PendingConfirm<E> {
    fn new(inner: &Rc<Inner<E>>, generation: u64) -> Self {
        Self {
            inner: Rc::clone(inner),
            generation,
            finished: false,
        }
    }

    fn finish(mut self, result: Result<ManipulateResult, ManipulateError>) -> ConfirmOutcome {
        self.finished = true;
        self.inner.finish_confirm(self.generation, result)
    }
}

impl<E> Drop for PendingConfirm<E> {
    fn drop(&mut self) {
        if !self.finished {
            self.inner.abandon_confirm(self.generation);
        }
    }
}

impl<E> Inner<E> {
    fn emit(&self, event: DiagnosticEvent) {
        self.sink.emit(event);
    }

    /// The confirm future was dropped before the engine answered.
    fn abandon_confirm(&self, generation: u64) {
        {
            let mut state = self.state.borrow_mut();
            if state.unmounted || state.generation != generation || !state.in_progress {
                return;
            }
            state.in_progress = false;
        }
        self.emit(DiagnosticEvent::CompletionDiscarded);
    }

    fn finish_confirm(
        &self,
        generation: u64,
        result: Result<ManipulateResult, ManipulateError>,
    ) -> ConfirmOutcome {
        {
            let mut state = self.state.borrow_mut();
            if state.unmounted || state.generation != generation {
                drop(state);
                self.emit(DiagnosticEvent::CompletionDiscarded);
                return ConfirmOutcome::Discarded;
            }
            state.in_progress = false;
        }

        match result {
            Ok(result) => {
                self.emit(DiagnosticEvent::CropSucceeded {
                    uri: result.uri.clone(),
                });
                self.invoke_on_crop(&result.uri);
                ConfirmOutcome::Cropped(result.uri)
            }
            Err(err) => {
                let message = err.to_string();
                self.emit(DiagnosticEvent::CropFailed {
                    message: message.clone(),
                });
                ConfirmOutcome::Failed(message)
            }
        }
    }

    /// Callbacks are taken out of their slot while running so they may call
    /// back into the session.
    fn invoke_on_crop(&self, uri: &str) {
        let taken = self.on_crop.borrow_mut().take();
        let Some(mut callback) = taken else {
            self.emit(DiagnosticEvent::CallbackMissing(Control::Confirm));
            return;
        };

        callback(uri.to_string());
        self.emit(DiagnosticEvent::CallbackInvoked(Control::Confirm));

        let mut slot = self.on_crop.borrow_mut();
        if slot.is_none() {
            *slot = Some(callback);
        }
    }

    fn invoke_on_cancel(&self) {
        let taken = self.on_cancel.borrow_mut().take();
        let Some(mut callback) = taken else {
            self.emit(DiagnosticEvent::CallbackMissing(Control::Cancel));
            return;
        };

        callback();
        self.emit(DiagnosticEvent::CallbackInvoked(Control::Cancel));

        let mut slot = self.on_cancel.borrow_mut();
        if slot.is_none() {
            *slot = Some(callback);
        }
    }
}

impl<E: ManipulationEngine> Inner<E> {
    fn begin_confirm(&self) -> Result<(u64, ManipulateFuture), IgnoreReason> {
        let started = {
            let mut state = self.state.borrow_mut();
            if state.unmounted {
                Err(IgnoreReason::Unmounted)
            } else if state.in_progress {
                Err(IgnoreReason::InProgress)
            } else if let Some(selection) = state.selection {
                state.in_progress = true;
                state.generation += 1;
                Ok((state.generation, selection))
            } else {
                Err(IgnoreReason::NoSelection)
            }
        };

        let (generation, selection) = match started {
            Ok(started) => started,
            Err(reason) => {
                self.emit(DiagnosticEvent::PressIgnored {
                    control: Control::Confirm,
                    reason,
                });
                return Err(reason);
            }
        };

        self.emit(DiagnosticEvent::CropStarted {
            image_uri: self.config.image_uri.clone(),
            selection,
            save: self.config.save,
        });

        let request =
            ManipulateRequest::crop(self.config.image_uri.clone(), selection, self.config.save);
        Ok((generation, self.engine.manipulate(request)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingSink;
    use crate::encode::SaveFormat;
    use futures::channel::oneshot;
    use futures::executor::block_on;
    use futures::FutureExt;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    type Reply = Result<ManipulateResult, ManipulateError>;

    /// Engine whose replies are released by the test.
    #[derive(Default)]
    struct FakeEngine {
        requests: RefCell<Vec<ManipulateRequest>>,
        replies: RefCell<VecDeque<oneshot::Sender<Reply>>>,
    }

    impl FakeEngine {
        fn request_count(&self) -> usize {
            self.requests.borrow().len()
        }

        fn last_request(&self) -> ManipulateRequest {
            self.requests.borrow().last().cloned().unwrap()
        }

        fn reply(&self, reply: Reply) {
            let sender = self.replies.borrow_mut().pop_front().unwrap();
            sender.send(reply).unwrap();
        }

        fn resolve(&self, uri: &str) {
            self.reply(Ok(ManipulateResult {
                uri: uri.to_string(),
                width: 10,
                height: 10,
            }));
        }

        fn reject(&self, message: &str) {
            self.reply(Err(ManipulateError::Rejected(message.to_string())));
        }
    }

    impl ManipulationEngine for FakeEngine {
        fn manipulate(&self, request: ManipulateRequest) -> ManipulateFuture {
            self.requests.borrow_mut().push(request);
            let (tx, rx) = oneshot::channel();
            self.replies.borrow_mut().push_back(tx);
            async move {
                rx.await
                    .unwrap_or_else(|_| Err(ManipulateError::Rejected("dropped".to_string())))
            }
            .boxed_local()
        }
    }

    struct Harness {
        session: CropSession<Rc<FakeEngine>>,
        engine: Rc<FakeEngine>,
        sink: Rc<RecordingSink>,
        crops: Rc<RefCell<Vec<String>>>,
        cancels: Rc<Cell<u32>>,
    }

    fn mount(image_uri: &str) -> Harness {
        let engine = Rc::new(FakeEngine::default());
        let sink = Rc::new(RecordingSink::new());
        let crops = Rc::new(RefCell::new(Vec::new()));
        let cancels = Rc::new(Cell::new(0));

        let props = {
            let crops = Rc::clone(&crops);
            let cancels = Rc::clone(&cancels);
            CropSessionProps::new(image_uri)
                .aspect(AspectRatio::new(1.0, 1.0))
                .on_crop(move |uri| crops.borrow_mut().push(uri))
                .on_cancel(move || cancels.set(cancels.get() + 1))
                .sink(sink.clone())
        };

        Harness {
            session: CropSession::new(props, Rc::clone(&engine)),
            engine,
            sink,
            crops,
            cancels,
        }
    }

    fn r1() -> CropSelection {
        CropSelection::new(10.0, 20.0, 100.0, 100.0)
    }

    fn confirm_control(view: &CropView) -> &ActionControl {
        &view.controls[1]
    }

    #[test]
    fn test_mount_emits_props_summary() {
        let h = mount("file://a.png");
        assert_eq!(
            h.sink.events()[0],
            DiagnosticEvent::Mounted {
                image_uri: "file://a.png".to_string(),
                has_on_crop: true,
                has_on_cancel: true,
                aspect: AspectRatio::SQUARE,
            }
        );
    }

    #[test]
    fn test_render_contract() {
        let h = mount("file://a.png");
        let view = h.session.render();

        assert_eq!(view.widget.image_uri, "file://a.png");
        assert_eq!(view.widget.aspect, AspectRatio::SQUARE);
        assert_eq!(view.widget.shape, CropShape::Rect);
        assert_eq!(view.layout, Layout::Row { gap: 16.0 });
        assert_eq!(view.controls[0].control, Control::Cancel);
        assert_eq!(view.controls[0].label, "Cancel");
        assert_eq!(view.controls[1].control, Control::Confirm);
        assert_eq!(view.controls[1].label, "Crop");
    }

    #[test]
    fn test_confirm_disabled_without_selection() {
        let h = mount("file://a.png");
        let view = h.session.render();

        assert!(!confirm_control(&view).enabled);
        assert_eq!(confirm_control(&view).background, "#ccc");
        assert!(view.controls[0].enabled);
    }

    #[test]
    fn test_forced_confirm_without_selection_is_noop() {
        let h = mount("file://a.png");
        h.sink.take();

        let outcome = block_on(h.session.confirm());

        assert_eq!(outcome, ConfirmOutcome::Ignored(IgnoreReason::NoSelection));
        assert_eq!(h.engine.request_count(), 0);
        assert!(h.crops.borrow().is_empty());
        assert_eq!(h.cancels.get(), 0);
        assert!(!h.session.is_in_progress());
        assert_eq!(h.session.selection(), None);
        assert_eq!(
            h.sink.events(),
            vec![DiagnosticEvent::PressIgnored {
                control: Control::Confirm,
                reason: IgnoreReason::NoSelection
            }]
        );
    }

    #[test]
    fn test_selection_enables_confirm() {
        let h = mount("file://a.png");
        assert!(h.session.report_selection(r1()));

        let view = h.session.render();
        assert!(confirm_control(&view).enabled);
        assert_eq!(confirm_control(&view).background, "#4ecdc4");
    }

    #[test]
    fn test_last_selection_wins() {
        let h = mount("file://a.png");
        let r2 = CropSelection::new(0.0, 0.0, 5.0, 7.0);

        h.session.report_selection(r1());
        h.session.report_selection(r2);

        assert_eq!(h.session.selection(), Some(r2));
        assert_eq!(
            h.sink.count(|e| matches!(e, DiagnosticEvent::SelectionUpdated(_))),
            2
        );
    }

    #[test]
    fn test_successful_crop_scenario() {
        let h = mount("file://a.png");
        h.session.report_selection(r1());

        let pending = h.session.confirm();

        // Flag is set and the engine called as soon as the press is handled
        assert!(h.session.is_in_progress());
        assert_eq!(
            h.engine.last_request(),
            ManipulateRequest::crop("file://a.png", r1(), SaveOptions::lossless())
        );
        let busy = h.session.render();
        assert_eq!(confirm_control(&busy).label, "Cropping...");
        assert!(!confirm_control(&busy).enabled);
        assert!(!busy.controls[0].enabled);

        h.engine.resolve("file://out.png");
        let outcome = block_on(pending);

        assert_eq!(outcome, ConfirmOutcome::Cropped("file://out.png".to_string()));
        assert_eq!(*h.crops.borrow(), vec!["file://out.png".to_string()]);
        assert_eq!(h.cancels.get(), 0);
        assert!(!h.session.is_in_progress());
        assert_eq!(confirm_control(&h.session.render()).label, "Crop");
    }

    #[test]
    fn test_request_is_lossless_full_quality() {
        let h = mount("file://a.png");
        h.session.report_selection(r1());
        let _pending = h.session.confirm();

        let save = h.engine.last_request().save;
        assert_eq!(save.format, SaveFormat::Png);
        assert_eq!(save.compress, 1.0);
    }

    #[test]
    fn test_failed_crop_scenario() {
        let h = mount("file://a.png");
        h.session.report_selection(r1());
        h.sink.take();

        let pending = h.session.confirm();
        h.engine.reject("disk full");
        let outcome = block_on(pending);

        assert!(matches!(outcome, ConfirmOutcome::Failed(ref m) if m.contains("disk full")));
        assert!(h.crops.borrow().is_empty());
        assert_eq!(h.cancels.get(), 0);
        assert!(!h.session.is_in_progress());
        assert_eq!(h.session.selection(), Some(r1()));
        assert!(h.session.can_confirm());
        assert_eq!(confirm_control(&h.session.render()).label, "Crop");
        assert_eq!(
            h.sink.count(|e| matches!(e, DiagnosticEvent::CropFailed { .. })),
            1
        );
    }

    #[test]
    fn test_retry_after_failure() {
        let h = mount("file://a.png");
        h.session.report_selection(r1());

        let first = h.session.confirm();
        h.engine.reject("flaky");
        block_on(first);

        let second = h.session.confirm();
        h.engine.resolve("file://retry.png");
        assert_eq!(
            block_on(second),
            ConfirmOutcome::Cropped("file://retry.png".to_string())
        );
        assert_eq!(h.engine.request_count(), 2);
        assert_eq!(*h.crops.borrow(), vec!["file://retry.png".to_string()]);
    }

    #[test]
    fn test_second_press_while_in_progress_is_ignored() {
        let h = mount("file://a.png");
        h.session.report_selection(r1());

        let first = h.session.confirm();
        let second = block_on(h.session.confirm());

        assert_eq!(second, ConfirmOutcome::Ignored(IgnoreReason::InProgress));
        assert_eq!(h.engine.request_count(), 1);

        h.engine.resolve("file://out.png");
        block_on(first);
        assert_eq!(h.crops.borrow().len(), 1);
    }

    #[test]
    fn test_cancel_disabled_while_in_progress() {
        let h = mount("file://a.png");
        h.session.report_selection(r1());
        let pending = h.session.confirm();

        assert!(!h.session.can_cancel());
        assert!(!h.session.cancel());
        assert_eq!(h.cancels.get(), 0);

        h.engine.resolve("file://out.png");
        block_on(pending);
        assert!(h.session.cancel());
        assert_eq!(h.cancels.get(), 1);
    }

    #[test]
    fn test_selection_updates_during_crop_are_applied() {
        let h = mount("file://a.png");
        h.session.report_selection(r1());
        let pending = h.session.confirm();

        let r2 = CropSelection::new(1.0, 1.0, 2.0, 2.0);
        h.session.report_selection(r2);
        assert_eq!(h.session.selection(), Some(r2));

        h.engine.resolve("file://out.png");
        block_on(pending);
        // The in-flight request kept the selection it was started with
        assert_eq!(
            h.engine.last_request().actions,
            vec![crate::engine::Action::Crop(r1())]
        );
    }

    #[test]
    fn test_cancel_before_selection() {
        let h = mount("file://a.png");

        assert!(h.session.cancel());

        assert_eq!(h.cancels.get(), 1);
        assert!(h.crops.borrow().is_empty());
        assert_eq!(h.engine.request_count(), 0);
    }

    #[test]
    fn test_cancel_leaves_state_alone() {
        let h = mount("file://a.png");
        h.session.report_selection(r1());

        h.session.cancel();
        assert_eq!(h.session.selection(), Some(r1()));
        assert!(h.session.can_confirm());
    }

    #[test]
    fn test_missing_callbacks_are_tolerated() {
        let engine = Rc::new(FakeEngine::default());
        let sink = Rc::new(RecordingSink::new());
        let session = CropSession::new(
            CropSessionProps::new("file://a.png").sink(sink.clone()),
            Rc::clone(&engine),
        );

        assert!(session.cancel());
        session.report_selection(r1());
        let pending = session.confirm();
        engine.resolve("file://out.png");

        assert_eq!(
            block_on(pending),
            ConfirmOutcome::Cropped("file://out.png".to_string())
        );
        assert_eq!(
            sink.count(|e| matches!(e, DiagnosticEvent::CallbackMissing(_))),
            2
        );
    }

    #[test]
    fn test_unmount_during_crop_discards_result() {
        let h = mount("file://a.png");
        h.session.report_selection(r1());
        let pending = h.session.confirm();

        h.session.unmount();
        h.engine.resolve("file://late.png");

        assert_eq!(block_on(pending), ConfirmOutcome::Discarded);
        assert!(h.crops.borrow().is_empty());
        assert!(!h.session.is_in_progress());
        assert_eq!(h.session.selection(), None);
        assert!(h
            .sink
            .events()
            .contains(&DiagnosticEvent::CompletionDiscarded));
    }

    #[test]
    fn test_unmount_during_failed_crop_is_silent() {
        let h = mount("file://a.png");
        h.session.report_selection(r1());
        let pending = h.session.confirm();

        h.session.unmount();
        h.engine.reject("boom");

        assert_eq!(block_on(pending), ConfirmOutcome::Discarded);
        assert_eq!(
            h.sink.count(|e| matches!(e, DiagnosticEvent::CropFailed { .. })),
            0
        );
    }

    #[test]
    fn test_dropped_confirm_releases_controls() {
        let h = mount("file://a.png");
        h.session.report_selection(r1());

        drop(h.session.confirm());

        assert!(!h.session.is_in_progress());
        assert!(h.session.can_confirm());
        assert!(h.session.can_cancel());
        assert_eq!(confirm_control(&h.session.render()).label, "Crop");
        assert_eq!(h.session.selection(), Some(r1()));
        assert_eq!(
            h.sink
                .count(|e| matches!(e, DiagnosticEvent::CompletionDiscarded)),
            1
        );

        let stale = h.engine.replies.borrow_mut().pop_front().unwrap();
        assert!(stale.is_canceled());

        let pending = h.session.confirm();
        h.engine.resolve("file://out.png");
        assert_eq!(
            block_on(pending),
            ConfirmOutcome::Cropped("file://out.png".to_string())
        );
        assert_eq!(*h.crops.borrow(), vec!["file://out.png".to_string()]);
    }

    #[test]
    fn test_dropping_confirm_after_unmount_is_silent() {
        let h = mount("file://a.png");
        h.session.report_selection(r1());
        let pending = h.session.confirm();

        h.session.unmount();
        drop(pending);

        assert_eq!(
            h.sink
                .count(|e| matches!(e, DiagnosticEvent::CompletionDiscarded)),
            0
        );
    }

    #[test]
    fn test_events_after_unmount_are_ignored() {
        let h = mount("file://a.png");
        h.session.unmount();
        h.session.unmount();

        assert!(!h.session.is_mounted());
        assert!(!h.session.report_selection(r1()));
        assert!(!h.session.cancel());
        assert_eq!(
            block_on(h.session.confirm()),
            ConfirmOutcome::Ignored(IgnoreReason::Unmounted)
        );
        assert_eq!(h.cancels.get(), 0);
        assert_eq!(h.session.selection(), None);
        assert_eq!(
            h.sink.count(|e| matches!(e, DiagnosticEvent::Unmounted)),
            1
        );
    }

    #[test]
    fn test_callback_may_reenter_session() {
        let engine = Rc::new(FakeEngine::default());
        let slot: Rc<RefCell<Option<CropSession<Rc<FakeEngine>>>>> = Rc::new(RefCell::new(None));

        let props = {
            let slot = Rc::clone(&slot);
            CropSessionProps::new("file://a.png")
                .sink(Rc::new(RecordingSink::new()))
                .on_crop(move |_| {
                    if let Some(session) = slot.borrow().as_ref() {
                        session.unmount();
                    }
                })
        };
        let session = CropSession::new(props, Rc::clone(&engine));
        *slot.borrow_mut() = Some(session.clone());

        session.report_selection(r1());
        let pending = session.confirm();
        engine.resolve("file://out.png");

        assert_eq!(
            block_on(pending),
            ConfirmOutcome::Cropped("file://out.png".to_string())
        );
        assert!(!session.is_mounted());
        slot.borrow_mut().take();
    }

    #[test]
    fn test_config_from_json() {
        let config: CropSessionConfig = serde_json::from_str(
            r#"{"imageUri":"file://a.png","aspect":[4,3],"style":{"cropperWidth":200},"save":{"format":"jpeg","compress":0.7}}"#,
        )
        .unwrap();

        assert_eq!(config.image_uri, "file://a.png");
        assert_eq!(config.aspect, AspectRatio::new(4.0, 3.0));
        assert_eq!(config.style.cropper_width, Some(200.0));
        assert_eq!(config.save.format, SaveFormat::Jpeg);

        let session = CropSession::new(
            CropSessionProps::from_config(config).sink(Rc::new(RecordingSink::new())),
            FakeEngine::default(),
        );
        assert_eq!(session.render().widget.width, 200.0);
    }

    #[test]
    fn test_config_defaults() {
        let config: CropSessionConfig =
            serde_json::from_str(r#"{"imageUri":"file://a.png"}"#).unwrap();
        assert_eq!(config.aspect, AspectRatio::SQUARE);
        assert_eq!(config.save, SaveOptions::lossless());
        assert!(config.style.is_empty());
    }
}
