use std::cell::{Cell, RefCell};
use std::rc::Rc;

use backdrop::headless::{HeadlessBackend, HeadlessContainer};
use backdrop::{
    backing_size, mount, CanvasConfig, CanvasHandle, CanvasStatus, Container, Host, LocalHost,
    LogicalSize, MountError, PhysicalSize, ShaderStage,
};

struct Fixture {
    container: Rc<HeadlessContainer>,
    host: Rc<LocalHost>,
    backend: HeadlessBackend,
}

impl Fixture {
    fn new(width: f64, height: f64, scale_factor: f64) -> Self {
        Self {
            container: Rc::new(HeadlessContainer::new(width, height, scale_factor)),
            host: Rc::new(LocalHost::new()),
            backend: HeadlessBackend::new(),
        }
    }

    fn mount(&mut self) -> Result<CanvasHandle, MountError> {
        self.mount_with(&CanvasConfig::default())
    }

    fn mount_with(&mut self, config: &CanvasConfig) -> Result<CanvasHandle, MountError> {
        mount(
            self.container.clone(),
            self.host.clone(),
            &mut self.backend,
            config,
        )
    }

    fn resize(&self, width: f64, height: f64) {
        self.container.set_size(width, height);
        self.host.dispatch_resize();
    }

    fn assert_clean(&self) {
        assert_eq!(self.host.pending_frames(), 0, "frame callbacks left behind");
        assert_eq!(self.host.listener_count(), 0, "resize listeners left behind");
        assert!(self.container.children().is_empty(), "surface left attached");
        assert!(
            self.backend.log().borrow().live.is_empty(),
            "surface not released"
        );
    }
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn mount_resize_unmount_scenario() {
    let mut fixture = Fixture::new(800.0, 600.0, 2.0);
    let canvas = fixture.mount().expect("mount");
    let id = canvas.surface_id();

    assert_eq!(fixture.container.children(), vec![id]);
    let before_first = canvas.uniforms().expect("mounted");
    assert_eq!(before_first.resolution, [1600.0, 1200.0]);
    assert_close(before_first.time, 1.0);
    assert_eq!(fixture.host.pending_frames(), 1);
    assert_eq!(fixture.host.listener_count(), 1);

    assert_eq!(fixture.host.run_frame(), 1);
    fixture.resize(400.0, 300.0);
    assert_eq!(
        canvas.uniforms().expect("mounted").resolution,
        [800.0, 600.0]
    );
    assert_eq!(fixture.host.run_frame(), 1);

    let draws = fixture.backend.log().borrow().draws_for(id);
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].resolution, [1600.0, 1200.0]);
    assert_close(draws[0].time, 1.05);
    assert_eq!(draws[1].resolution, [800.0, 600.0]);
    assert_close(draws[1].time, 1.10);

    let stats = canvas.unmount();
    assert_eq!(stats.frames_presented, 2);
    assert_close(stats.final_time, 1.10);
    fixture.assert_clean();
    assert_eq!(fixture.backend.log().borrow().released, vec![id]);
}

#[test]
fn resolution_tracks_every_resize_before_the_next_frame() {
    let mut fixture = Fixture::new(640.0, 480.0, 1.0);
    let canvas = fixture.mount().expect("mount");
    let id = canvas.surface_id();

    let steps = [
        (1024.0, 768.0, 1.0),
        (333.0, 100.0, 1.25),
        (800.5, 600.0, 1.5),
        (1.0, 1.0, 3.0),
        (1920.0, 1080.0, 2.0),
    ];
    for (width, height, scale) in steps {
        fixture.container.set_scale_factor(scale);
        fixture.resize(width, height);
        fixture.host.run_frame();

        let expected = backing_size(LogicalSize::new(width, height), scale);
        let last = *fixture
            .backend
            .log()
            .borrow()
            .draws_for(id)
            .last()
            .expect("a frame was drawn");
        assert_eq!(
            last.resolution,
            [expected.width as f32, expected.height as f32],
            "{width}x{height} @ {scale}"
        );
    }
    drop(canvas);
    fixture.assert_clean();
}

#[test]
fn several_resizes_between_frames_use_the_latest_size() {
    let mut fixture = Fixture::new(800.0, 600.0, 1.0);
    let canvas = fixture.mount().expect("mount");
    fixture.resize(100.0, 100.0);
    fixture.resize(300.0, 200.0);
    fixture.host.run_frame();

    let draws = fixture.backend.log().borrow().draws_for(canvas.surface_id());
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].resolution, [300.0, 200.0]);
}

#[test]
fn time_advances_by_a_fixed_step_per_frame() {
    let mut fixture = Fixture::new(64.0, 64.0, 1.0);
    let config = CanvasConfig {
        initial_time: 0.0,
        step: 0.25,
        ..CanvasConfig::default()
    };
    let canvas = fixture.mount_with(&config).expect("mount");

    for _ in 0..100 {
        fixture.host.run_frame();
    }
    let draws = fixture.backend.log().borrow().draws_for(canvas.surface_id());
    assert_eq!(draws.len(), 100);
    for (index, pair) in draws.windows(2).enumerate() {
        assert!(pair[1].time > pair[0].time, "time went backwards at {index}");
        assert_close(pair[1].time - pair[0].time, 0.25);
    }
    assert_close(draws[99].time, 25.0);
    assert_eq!(canvas.frames_presented(), 100);
}

#[test]
fn resize_does_not_touch_time() {
    let mut fixture = Fixture::new(64.0, 64.0, 1.0);
    let canvas = fixture.mount().expect("mount");
    fixture.host.run_frame();
    let before = canvas.uniforms().expect("mounted").time;
    fixture.resize(10.0, 10.0);
    fixture.resize(64.0, 64.0);
    assert_eq!(canvas.uniforms().expect("mounted").time, before);
}

#[test]
fn unmount_cancels_a_pending_frame() {
    let mut fixture = Fixture::new(320.0, 200.0, 1.0);
    let canvas = fixture.mount().expect("mount");
    fixture.host.run_frame();
    assert_eq!(fixture.host.pending_frames(), 1);

    canvas.unmount();
    assert_eq!(fixture.host.run_frame(), 0);
    assert_eq!(fixture.host.dispatch_resize(), 0);
    assert_eq!(fixture.backend.log().borrow().draws.len(), 1);
    fixture.assert_clean();
}

#[test]
fn unmount_from_an_earlier_frame_callback_skips_the_canvas_frame() {
    let mut fixture = Fixture::new(320.0, 200.0, 1.0);
    let slot: Rc<RefCell<Option<CanvasHandle>>> = Rc::new(RefCell::new(None));

    let unmounter = slot.clone();
    fixture.host.request_frame(Box::new(move || {
        if let Some(canvas) = unmounter.borrow_mut().take() {
            canvas.unmount();
        }
    }));
    *slot.borrow_mut() = Some(fixture.mount().expect("mount"));

    assert_eq!(fixture.host.run_frame(), 1);
    assert!(fixture.backend.log().borrow().draws.is_empty());
    fixture.assert_clean();
}

#[test]
fn unmount_from_an_earlier_resize_listener_skips_the_canvas_listener() {
    let mut fixture = Fixture::new(320.0, 200.0, 1.0);
    let slot: Rc<RefCell<Option<CanvasHandle>>> = Rc::new(RefCell::new(None));

    let unmounter = slot.clone();
    let remover = fixture.host.add_resize_listener(Box::new(move || {
        if let Some(canvas) = unmounter.borrow_mut().take() {
            canvas.unmount();
        }
    }));
    *slot.borrow_mut() = Some(fixture.mount().expect("mount"));

    fixture.resize(999.0, 999.0);
    assert!(fixture.backend.log().borrow().resizes.is_empty());

    fixture.host.remove_resize_listener(remover);
    fixture.assert_clean();
}

#[test]
fn zero_area_container_is_safe_and_recovers() {
    let mut fixture = Fixture::new(0.0, 600.0, 2.0);
    let canvas = fixture.mount().expect("mount into zero-width container");

    let uniforms = canvas.uniforms().expect("mounted");
    assert!(uniforms.is_finite());
    assert_eq!(uniforms.resolution, [0.0, 1200.0]);

    fixture.host.run_frame();
    {
        let log = fixture.backend.log();
        let log = log.borrow();
        assert!(log.draws.is_empty());
        assert_eq!(log.skipped, 1);
    }
    assert_close(canvas.uniforms().expect("mounted").time, 1.05);
    assert_eq!(canvas.status(), CanvasStatus::Running);

    fixture.resize(100.0, 50.0);
    fixture.host.run_frame();
    let draws = fixture.backend.log().borrow().draws_for(canvas.surface_id());
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].resolution, [200.0, 100.0]);
    assert!(draws[0].is_finite());
    assert_close(draws[0].time, 1.10);

    fixture.resize(100.0, 0.0);
    assert!(canvas.uniforms().expect("mounted").is_finite());
}

#[test]
fn sequential_mounts_leave_nothing_from_the_first_cycle() {
    let mut fixture = Fixture::new(800.0, 600.0, 1.0);
    let first = fixture.mount().expect("first mount");
    let first_id = first.surface_id();
    fixture.host.run_frame();
    first.unmount();

    let second = fixture.mount().expect("second mount");
    assert_ne!(second.surface_id(), first_id);
    assert_eq!(fixture.container.children(), vec![second.surface_id()]);
    assert_eq!(fixture.host.listener_count(), 1);
    assert_eq!(fixture.host.pending_frames(), 1);
    {
        let log = fixture.backend.log();
        let log = log.borrow();
        assert_eq!(log.live.len(), 1);
        assert!(log.live.contains(&second.surface_id()));
    }

    fixture.host.run_frame();
    let draws = fixture.backend.log().borrow().draws_for(second.surface_id());
    assert_eq!(draws.len(), 1);
    assert_close(draws[0].time, 1.05);

    second.unmount();
    fixture.assert_clean();
}

#[test]
fn dropping_the_handle_tears_the_canvas_down() {
    let mut fixture = Fixture::new(800.0, 600.0, 1.0);
    {
        let _canvas = fixture.mount().expect("mount");
        fixture.host.run_frame();
    }
    fixture.assert_clean();
    assert_eq!(fixture.host.run_frame(), 0);
}

#[test]
fn surface_loss_stops_the_loop_and_notifies_once() {
    let mut fixture = Fixture::new(800.0, 600.0, 1.0);
    let canvas = fixture.mount().expect("mount");
    let notified = Rc::new(Cell::new(0));
    let counter = notified.clone();
    canvas.on_surface_lost(move |lost| {
        assert!(lost.reason.contains("lost"));
        counter.set(counter.get() + 1);
    });

    fixture.host.run_frame();
    fixture.backend.lose_surface(canvas.surface_id());
    fixture.host.run_frame();

    assert!(matches!(canvas.status(), CanvasStatus::Lost(_)));
    assert_eq!(notified.get(), 1);
    assert_eq!(fixture.host.pending_frames(), 0);
    assert_eq!(fixture.host.run_frame(), 0);
    assert_eq!(canvas.frames_presented(), 1);

    let late = Rc::new(Cell::new(false));
    let flag = late.clone();
    canvas.on_surface_lost(move |_| flag.set(true));
    assert!(late.get());
    assert_eq!(notified.get(), 1);

    fixture.resize(10.0, 10.0);
    assert!(fixture.backend.log().borrow().resizes.is_empty());

    canvas.unmount();
    fixture.assert_clean();
}

#[test]
fn every_loss_subscriber_is_notified_in_order() {
    let mut fixture = Fixture::new(800.0, 600.0, 1.0);
    let canvas = fixture.mount().expect("mount");
    let order = Rc::new(RefCell::new(Vec::new()));
    for name in ["first", "second"] {
        let order = order.clone();
        canvas.on_surface_lost(move |_| order.borrow_mut().push(name));
    }

    fixture.backend.lose_surface(canvas.surface_id());
    fixture.host.run_frame();
    fixture.host.run_frame();

    assert_eq!(*order.borrow(), vec!["first", "second"]);
    canvas.unmount();
    fixture.assert_clean();
}

#[test]
fn compile_failure_attaches_nothing() {
    let mut fixture = Fixture::new(800.0, 600.0, 1.0);
    fixture
        .backend
        .set_compile_failure(Some("0:12: 'vec5' : undeclared identifier"));

    let err = fixture.mount().err().expect("mount must fail");
    match err {
        MountError::ShaderCompile { stage, diagnostic } => {
            assert_eq!(stage, ShaderStage::Fragment);
            assert!(diagnostic.contains("vec5"));
        }
        other => panic!("unexpected error: {other}"),
    }
    fixture.assert_clean();
}

#[test]
fn unavailable_backend_reports_surface_unavailable() {
    let mut fixture = Fixture::new(800.0, 600.0, 1.0);
    fixture.backend.set_unavailable(Some("no adapter"));

    let err = fixture.mount().err().expect("mount must fail");
    assert_eq!(err, MountError::SurfaceUnavailable("no adapter".into()));
    fixture.assert_clean();

    fixture.backend.set_unavailable(None);
    let canvas = fixture.mount().expect("mount after recovery");
    assert_eq!(fixture.container.children(), vec![canvas.surface_id()]);
}

#[test]
fn invalid_config_is_rejected_before_any_allocation() {
    let mut fixture = Fixture::new(800.0, 600.0, 1.0);
    let config = CanvasConfig {
        step: 0.0,
        ..CanvasConfig::default()
    };
    let err = fixture.mount_with(&config).err().expect("mount must fail");
    assert!(matches!(err, MountError::InvalidConfig(_)));
    fixture.assert_clean();
    assert!(fixture.backend.log().borrow().released.is_empty());
}

#[test]
fn resolution_reflects_the_clamped_surface_size() {
    let mut fixture = Fixture::new(800.0, 600.0, 1.0);
    fixture.backend.set_max_dimension(Some(1000));
    let canvas = fixture.mount().expect("mount");

    fixture.container.set_scale_factor(2.0);
    fixture.host.dispatch_resize();
    assert_eq!(
        canvas.uniforms().expect("mounted").resolution,
        [1000.0, 1000.0]
    );
    assert_eq!(
        fixture.container.backing_size(),
        PhysicalSize::new(1600, 1200)
    );
}
