use crate::analysis;
use crate::config::{self, Config};
use crate::engine::{CompassEngine, CompassLayout};
use crate::events::AppEvent;
use crate::gui::window;
use crate::orientation::{OrientationController, Permission, RotateDirection};
use crate::render::{CairoSurface, CompassRenderer};
use crate::theme::{self, ThemeName};
use bearing::{HeadingFeed, PermissionResponse, ThemeSelector, normalize};
use gtk::gdk;
use gtk::prelude::*;
use gtk4 as gtk;
use relm4::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

pub struct AppInit {
    pub config: Config,
    pub overlay: bool,
    pub controller: OrientationController,
    /// Feed that socket headings are published into.
    pub feed: HeadingFeed,
    pub rx: async_channel::Receiver<AppEvent>,
}

pub struct AppModel {
    engine: Rc<RefCell<CompassEngine>>,
    renderer: Rc<RefCell<CompassRenderer>>,
    controller: Rc<RefCell<OrientationController>>,
    feed: HeadingFeed,
    config: Config,
    theme: ThemeName,
    visible: bool,
    readout: String,
    drawing_area: gtk::DrawingArea,
}

#[derive(Debug)]
pub enum AppMsg {
    Show,
    Hide,
    Heading(f64),
    Rotate(f64),
    RotateStep(RotateDirection),
    Theme(ThemeSelector),
    CycleTheme,
    RequestPermission,
    PermissionAnswered(PermissionResponse),
    AngleChanged(f64),
    ConfigReload,
}

impl From<AppEvent> for AppMsg {
    fn from(event: AppEvent) -> Self {
        match event {
            AppEvent::Show => AppMsg::Show,
            AppEvent::Hide => AppMsg::Hide,
            AppEvent::Heading(h) => AppMsg::Heading(h),
            AppEvent::Rotate(d) => AppMsg::Rotate(d),
            AppEvent::Theme(t) => AppMsg::Theme(t),
            AppEvent::ConfigReload => AppMsg::ConfigReload,
        }
    }
}

fn key_message(key: gdk::Key) -> Option<AppMsg> {
    match key {
        gdk::Key::Left => Some(AppMsg::Rotate(-1.0)),
        gdk::Key::Right => Some(AppMsg::Rotate(1.0)),
        gdk::Key::Page_Up => Some(AppMsg::RotateStep(RotateDirection::CounterClockwise)),
        gdk::Key::Page_Down => Some(AppMsg::RotateStep(RotateDirection::Clockwise)),
        gdk::Key::t | gdk::Key::T => Some(AppMsg::CycleTheme),
        gdk::Key::p | gdk::Key::P => Some(AppMsg::RequestPermission),
        gdk::Key::Escape => Some(AppMsg::Hide),
        _ => None,
    }
}

impl AppModel {
    fn apply_theme(&mut self, name: ThemeName) {
        let theme = theme::lookup(name);
        let settings = self.config.orientation_settings(&theme);
        {
            let mut controller = self.controller.borrow_mut();
            controller.set_heading_offset(settings.heading_offset);
            if let Err(e) = controller.set_damping_factor(settings.damping_factor) {
                log::warn!("Theme '{}': {}", name, e);
            }
        }
        self.renderer.borrow_mut().set_theme(theme);
        self.theme = name;
        log::info!("Theme set to '{}'", name);
        self.drawing_area.queue_draw();
    }

    fn readout_for(&self, angle: f64) -> String {
        let offset = self.renderer.borrow().theme().heading_offset;
        let heading = normalize(offset - angle);
        let a = analysis::analyze(heading);
        format!(
            "{:.1}°  坐{}向{}  {}  {} {:.0}%",
            heading,
            a.sitting.name,
            a.facing.name,
            a.sector8.trigram.hanzi(),
            a.classification,
            a.confidence * 100.0
        )
    }
}

#[relm4::component(pub)]
impl SimpleComponent for AppModel {
    type Init = AppInit;
    type Input = AppMsg;
    type Output = ();

    view! {
        #[root]
        #[name = "window"]
        gtk::ApplicationWindow {
            set_title: Some("Luopan"),
            set_default_size: (520, 560),
            #[watch]
            set_visible: model.visible,
            add_css_class: "luopan-window",

            add_controller = gtk::EventControllerKey {
                connect_key_pressed[sender] => move |_, key, _, _| {
                    match key_message(key) {
                        Some(msg) => {
                            sender.input(msg);
                            glib::Propagation::Stop
                        }
                        None => glib::Propagation::Proceed,
                    }
                }
            },

            gtk::Box {
                set_orientation: gtk::Orientation::Vertical,

                #[name = "drawing_area"]
                gtk::DrawingArea {
                    set_hexpand: true,
                    set_vexpand: true,
                    add_css_class: "luopan-drawing-area",
                },

                gtk::Label {
                    add_css_class: "luopan-readout",
                    #[watch]
                    set_label: &model.readout,
                }
            }
        }
    }

    fn init(
        init: Self::Init,
        root: Self::Root,
        sender: ComponentSender<Self>,
    ) -> ComponentParts<Self> {
        let AppInit {
            config,
            overlay,
            controller,
            feed,
            rx,
        } = init;

        window::load_css();
        if overlay {
            window::init_layer_shell(&root);
        }

        let mut engine = CompassEngine::new(CompassLayout::default());
        engine.set_compass_data(config.ring_specs());
        let theme_name = config.theme;

        let controller = Rc::new(RefCell::new(controller));
        {
            let sender = sender.clone();
            controller
                .borrow_mut()
                .on_angle_change(move |angle| sender.input(AppMsg::AngleChanged(angle)));
        }

        let model = AppModel {
            engine: Rc::new(RefCell::new(engine)),
            renderer: Rc::new(RefCell::new(CompassRenderer::new(theme::lookup(theme_name)))),
            controller,
            feed,
            config,
            theme: theme_name,
            visible: !overlay,
            readout: String::new(),
            drawing_area: gtk::DrawingArea::default(),
        };

        let widgets = view_output!();

        let mut model = model;
        model.drawing_area = widgets.drawing_area.clone();
        model.readout = model.readout_for(model.controller.borrow().current_angle());

        let (engine, renderer, controller) = (
            model.engine.clone(),
            model.renderer.clone(),
            model.controller.clone(),
        );
        widgets
            .drawing_area
            .set_draw_func(move |_, cr, width, height| {
                let mut engine = engine.borrow_mut();
                match CompassLayout::fit(width as f64, height as f64) {
                    Ok(layout) if *engine.config() != layout => engine.set_layout(layout),
                    Ok(_) => {}
                    Err(e) => {
                        log::error!("Cannot fit compass into {}x{}: {}", width, height, e);
                        return;
                    }
                }
                let angle = controller.borrow().current_angle();
                let report = renderer
                    .borrow()
                    .render(&engine, &mut CairoSurface::new(cr), angle);
                if !report.is_complete() {
                    log::debug!("Frame drawn with {} failed phases", report.failed.len());
                }
            });

        // one damping step per display frame
        let ticking = model.controller.clone();
        widgets.drawing_area.add_tick_callback(move |_, _| {
            let animating = ticking.borrow().is_animating();
            if animating {
                ticking.borrow_mut().advance();
            }
            glib::ControlFlow::Continue
        });

        let sender_clone = sender.clone();
        relm4::spawn(async move {
            while let Ok(event) = rx.recv().await {
                sender_clone.input(AppMsg::from(event));
            }
        });

        if model.visible {
            sender.input(AppMsg::RequestPermission);
        }

        ComponentParts { model, widgets }
    }

    fn update(&mut self, msg: Self::Input, sender: ComponentSender<Self>) {
        match msg {
            AppMsg::Show => {
                self.visible = true;
                if self.controller.borrow().permission() == Permission::Unknown {
                    sender.input(AppMsg::RequestPermission);
                }
                self.drawing_area.queue_draw();
            }
            AppMsg::Hide => {
                self.visible = false;
            }
            AppMsg::Heading(h) => {
                if self.feed.publish(h) == 0 {
                    log::debug!("Heading {} dropped, nothing is listening", h);
                }
            }
            AppMsg::Rotate(delta) => self.controller.borrow_mut().rotate_manually(delta),
            AppMsg::RotateStep(direction) => self.controller.borrow_mut().rotate_step(direction),
            AppMsg::Theme(ThemeSelector::Next) | AppMsg::CycleTheme => {
                self.apply_theme(self.theme.next());
            }
            AppMsg::Theme(ThemeSelector::Named(name)) => match name.parse::<ThemeName>() {
                Ok(t) => self.apply_theme(t),
                Err(_) => log::warn!("Unknown theme '{}'", name),
            },
            AppMsg::RequestPermission => {
                let prompt = self.controller.borrow_mut().begin_permission_request();
                if let Some(prompt) = prompt {
                    relm4::spawn_local(async move {
                        let response = prompt.await;
                        sender.input(AppMsg::PermissionAnswered(response));
                    });
                }
            }
            AppMsg::PermissionAnswered(response) => {
                self.controller
                    .borrow_mut()
                    .complete_permission_request(response);
            }
            AppMsg::AngleChanged(angle) => {
                self.readout = self.readout_for(angle);
                self.drawing_area.queue_draw();
            }
            AppMsg::ConfigReload => match config::load_config() {
                Ok(new_config) => {
                    theme::install(new_config.theme_registry());
                    let warnings = self
                        .engine
                        .borrow_mut()
                        .set_compass_data(new_config.ring_specs());
                    if new_config.orientation.sensor != self.config.orientation.sensor {
                        log::info!("Sensor source change applies after restart");
                    }
                    let theme = new_config.theme;
                    self.config = new_config;
                    self.apply_theme(theme);
                    log::info!(
                        "Configuration reloaded ({} ring corrections)",
                        warnings.len()
                    );
                }
                Err(e) => log::error!("Failed to reload config: {}", e),
            },
        }
    }

    fn shutdown(&mut self, _widgets: &mut Self::Widgets, _output: relm4::Sender<Self::Output>) {
        self.controller.borrow_mut().dispose();
    }
}
