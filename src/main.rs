//! Memory Tree entry point
//!
//! Handles platform-specific initialization and runs the frame loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, Document, Element, HtmlCanvasElement, HtmlElement, PointerEvent};

    use memory_tree::audio::AudioFacility;
    use memory_tree::audio::web::WebAudioBackend;
    use memory_tree::consts::*;
    use memory_tree::effects::ParticleField;
    use memory_tree::preload::web::{self as loader, ClipMap};
    use memory_tree::preload::{Manifest, Preloader};
    use memory_tree::sim::{GameEvent, GameMode, Session};
    use memory_tree::{Catalog, ItemId, Settings};

    /// Length of the CSS assembly timeline (seconds)
    const ASSEMBLY_SECS: f32 = 4.0;

    /// App instance holding all state
    struct App {
        session: Session,
        audio: Option<AudioFacility<WebAudioBackend>>,
        particles: ParticleField,
        fx_rng: Pcg32,
        preloader: Rc<RefCell<Preloader>>,
        clips: ClipMap,
        canvas: Option<(HtmlCanvasElement, CanvasRenderingContext2d)>,
        accumulator: f32,
        last_time: f64,
        /// Countdown of the assembly timeline; completion advances the session
        assembly_remaining: Option<f32>,
        /// Envelope elements indexed by id - 1
        envelopes: Vec<Element>,
        /// Held envelope centre minus pointer, so it does not jump on pickup
        drag_offset: Vec2,
    }

    fn document() -> Option<Document> {
        web_sys::window()?.document()
    }

    fn by_id(id: &str) -> Option<Element> {
        document()?.get_element_by_id(id)
    }

    fn set_class(el: &Element, class: &str, on: bool) {
        let _ = el.class_list().toggle_with_force(class, on);
    }

    fn set_hidden(id: &str, hidden: bool) {
        if let Some(el) = by_id(id) {
            set_class(&el, "hidden", hidden);
        }
    }

    fn now_secs() -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now() / 1000.0)
            .unwrap_or_else(|| js_sys::Date::now() / 1000.0)
    }

    /// Convert client pixels to scene percent
    fn to_scene(x: f32, y: f32) -> Vec2 {
        let Some(window) = web_sys::window() else { return Vec2::ZERO };
        let w = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(1.0) as f32;
        let h = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(1.0) as f32;
        Vec2::new(x / w.max(1.0) * 100.0, y / h.max(1.0) * 100.0)
    }

    fn client_pos(event: &PointerEvent) -> Vec2 {
        Vec2::new(event.client_x() as f32, event.client_y() as f32)
    }

    /// Settings override from `<body data-settings="{...}">`
    fn load_settings() -> Settings {
        let json = document()
            .and_then(|d| d.body())
            .and_then(|b| b.get_attribute("data-settings"));
        match json {
            Some(json) => Settings::from_json(&json).unwrap_or_else(|err| {
                log::warn!("Ignoring settings override: {}", err);
                Settings::default()
            }),
            None => Settings::default(),
        }
    }

    impl App {
        fn new(session: Session, preloader: Rc<RefCell<Preloader>>, clips: ClipMap, seed: u64) -> Self {
            let particles = ParticleField::new(session.settings().max_particles());
            Self {
                session,
                audio: None,
                particles,
                fx_rng: Pcg32::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15),
                preloader,
                clips,
                canvas: None,
                accumulator: 0.0,
                last_time: 0.0,
                assembly_remaining: None,
                envelopes: Vec::new(),
                drag_offset: Vec2::ZERO,
            }
        }

        /// First user gesture: create and unlock audio
        fn unlock_audio(&mut self) {
            let audio = self.audio.get_or_insert_with(|| {
                let settings = self.session.settings();
                let clips = self.clips.borrow().clone();
                AudioFacility::new(WebAudioBackend::new(
                    clips,
                    settings.effect_volume(),
                    settings.track_volume(),
                ))
            });
            audio.unlock();
        }

        /// Apply queued session events
        fn flush(&mut self) {
            for event in self.session.drain_events() {
                match event {
                    GameEvent::Sound(sound) => {
                        if let Some(audio) = self.audio.as_mut() {
                            audio.apply(sound);
                        }
                    }
                    GameEvent::Burst { at, count, style } => {
                        self.particles.burst(&mut self.fx_rng, at, count, style);
                    }
                    GameEvent::AmbientEffects(on) => {
                        let on = on && self.session.settings().effective_ambient();
                        self.particles.set_ambient(on);
                    }
                    GameEvent::ModeChanged { to, .. } => {
                        if let Some(body) = document().and_then(|d| d.body()) {
                            let _ = body.set_attribute("data-mode", to.as_str());
                        }
                        if to == GameMode::Assembling {
                            self.assembly_remaining = Some(ASSEMBLY_SECS);
                        }
                        if to == GameMode::Cover {
                            self.assembly_remaining = None;
                            self.particles.clear();
                        }
                    }
                    GameEvent::OpenMessage { item } => {
                        if let Some(title) = by_id("message-title") {
                            let text = self.session.catalog().get(item).map(|i| i.title.as_str());
                            title.set_text_content(text);
                        }
                        set_hidden("message", false);
                    }
                    GameEvent::CloseMessage => set_hidden("message", true),
                    GameEvent::ItemError { item } => {
                        if let Some(el) = self.envelope(item) {
                            set_class(el, "shake", true);
                        }
                    }
                    GameEvent::TopperReturned => {
                        if let Some(star) = by_id("star") {
                            set_class(&star, "bounce", false);
                            set_class(&star, "bounce", true);
                        }
                    }
                    GameEvent::ItemUncovered { .. }
                    | GameEvent::SecretUnlocked
                    | GameEvent::LayoutChanged => {}
                }
            }
        }

        fn envelope(&self, id: ItemId) -> Option<&Element> {
            self.envelopes.get((id as usize).checked_sub(1)?)
        }

        /// Fixed-step timers
        fn update(&mut self, dt: f32) {
            let dt = dt.min(0.1);
            self.accumulator += dt;

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                self.session.tick(SIM_DT);
                self.particles.update(&mut self.fx_rng, SIM_DT);

                let became_ready = self.preloader.borrow_mut().tick(SIM_DT);
                if became_ready {
                    set_hidden("loading", true);
                    set_hidden("cover", false);
                }

                if let Some(remaining) = self.assembly_remaining.as_mut() {
                    *remaining -= SIM_DT;
                    if *remaining <= 0.0 {
                        self.assembly_remaining = None;
                        let _ = self.session.finish_assembly();
                    }
                }

                self.accumulator -= SIM_DT;
                substeps += 1;
            }
            self.flush();
        }

        /// Mirror session state into the DOM
        fn sync_dom(&self) {
            let mode = self.session.mode();
            let on_tree = matches!(
                mode,
                GameMode::Assembling | GameMode::PlacingStar | GameMode::Completed
            );
            let targets = if on_tree { self.session.assembly_targets() } else { Vec::new() };

            for item in self.session.catalog().iter() {
                let (Some(el), Some(status)) = (self.envelope(item.id), self.session.item_status(item.id)) else {
                    continue;
                };
                let (pos, rotation) = match targets.iter().find(|(id, _)| *id == item.id) {
                    Some((_, slot)) => (*slot, 0.0),
                    None => (status.layout.pos, status.layout.rotation),
                };
                if let Some(html) = el.dyn_ref::<HtmlElement>() {
                    let style = html.style();
                    let _ = style.set_property("left", &format!("{:.2}%", pos.x));
                    let _ = style.set_property("top", &format!("{:.2}%", pos.y));
                    let _ = style.set_property(
                        "transform",
                        &format!("translate(-50%, -50%) rotate({:.1}deg) scale({:.2})", rotation, item.scale),
                    );
                    let _ = style.set_property("z-index", &status.layout.z.to_string());
                    let _ = style.set_property("--cover", &format!("{:.2}", status.cover));
                }
                set_class(el, "read", status.read);
                set_class(el, "covered", status.covered);
                if !status.erroring {
                    set_class(el, "shake", false);
                }
            }

            if let Some(star) = by_id("star").and_then(|e| e.dyn_into::<HtmlElement>().ok()) {
                let pos = self.session.topper().pos;
                let style = star.style();
                let _ = style.set_property("left", &format!("{:.2}%", pos.x));
                let _ = style.set_property("top", &format!("{:.2}%", pos.y));
            }

            if let (Some(reader), Some(body)) = (self.session.message(), by_id("message-body")) {
                if let Some(item) = self.session.catalog().get(reader.item()) {
                    body.set_text_content(Some(reader.visible(&item.message)));
                }
            }

            if let Some(counter) = by_id("counter") {
                counter.set_text_content(Some(&format!(
                    "{}/{}",
                    self.session.read_count(),
                    self.session.catalog().len()
                )));
            }
        }

        /// Draw particles on the overlay canvas
        fn render_particles(&self) {
            let Some((canvas, ctx)) = &self.canvas else { return };
            let w = canvas.width() as f64;
            let h = canvas.height() as f64;
            ctx.clear_rect(0.0, 0.0, w, h);
            for p in self.particles.particles() {
                ctx.set_global_alpha(p.life.clamp(0.0, 1.0) as f64);
                ctx.set_fill_style_str(&format!("#{:06x}", p.color));
                ctx.begin_path();
                let x = p.pos.x as f64 / 100.0 * w;
                let y = p.pos.y as f64 / 100.0 * h;
                let r = (p.size as f64 / 100.0 * w.min(h)).max(1.0);
                let _ = ctx.arc(x, y, r, 0.0, std::f64::consts::TAU);
                ctx.fill();
            }
            ctx.set_global_alpha(1.0);
        }
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        if let Err(err) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Logger init failed: {err}").into());
        }

        log::info!("Memory Tree starting...");

        let catalog = match Catalog::builtin() {
            Ok(catalog) => catalog,
            Err(err) => {
                log::error!("Catalog unusable: {}", err);
                return;
            }
        };
        let settings = load_settings();
        let manifest = Manifest::for_catalog(&catalog);
        let preloader = Rc::new(RefCell::new(Preloader::new(&manifest, settings.preload_grace_secs)));

        let on_progress: loader::ProgressFn = Rc::new(|percent: u8| {
            if let Some(el) = by_id("loading-progress") {
                el.set_text_content(Some(&format!("{percent}%")));
            }
        });
        let clips = loader::start(&manifest, preloader.clone(), on_progress);

        let seed = js_sys::Date::now() as u64;
        let session = Session::new(catalog, settings, seed);
        let app = Rc::new(RefCell::new(App::new(session, preloader, clips, seed)));
        log::info!("Session initialized with seed: {}", seed);

        setup_canvas(&app);
        build_envelopes(&app);
        setup_buttons(app.clone());
        setup_pointer_handlers(app.clone());
        setup_keyboard(app.clone());

        request_animation_frame(app);

        log::info!("Memory Tree running!");
    }

    fn setup_canvas(app: &Rc<RefCell<App>>) {
        let Some(canvas) = by_id("fx").and_then(|e| e.dyn_into::<HtmlCanvasElement>().ok()) else {
            log::warn!("No #fx canvas - particles disabled");
            return;
        };
        let Some(window) = web_sys::window() else { return };
        let dpr = window.device_pixel_ratio();
        canvas.set_width((canvas.client_width() as f64 * dpr) as u32);
        canvas.set_height((canvas.client_height() as f64 * dpr) as u32);

        let ctx = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok());
        if let Some(ctx) = ctx {
            app.borrow_mut().canvas = Some((canvas, ctx));
        }
    }

    fn build_envelopes(app: &Rc<RefCell<App>>) {
        let Some(document) = document() else { return };
        let Some(scene) = document.get_element_by_id("scene") else {
            log::error!("No #scene element");
            return;
        };

        let mut a = app.borrow_mut();
        let mut envelopes = Vec::with_capacity(a.session.catalog().len());
        for item in a.session.catalog().iter() {
            let Ok(el) = document.create_element("div") else { continue };
            let _ = el.set_attribute("class", "envelope");
            let _ = el.set_attribute("data-id", &item.id.to_string());
            if let Ok(img) = document.create_element("img") {
                let _ = img.set_attribute("src", &item.image);
                let _ = img.set_attribute("alt", &item.title);
                let _ = img.set_attribute("draggable", "false");
                let _ = el.append_child(&img);
            }
            let _ = scene.append_child(&el);
            envelopes.push(el);
        }
        a.envelopes = envelopes;
    }

    /// Wire a click handler on `#id` that runs `action` and flushes events
    fn on_click(app: &Rc<RefCell<App>>, id: &str, action: fn(&mut App)) {
        let Some(btn) = by_id(id) else {
            log::warn!("Missing #{}", id);
            return;
        };
        let app = app.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
            let mut a = app.borrow_mut();
            action(&mut a);
            a.flush();
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_buttons(app: Rc<RefCell<App>>) {
        on_click(&app, "start-btn", |a| {
            a.unlock_audio();
            if a.session.start_game().is_ok() {
                set_hidden("cover", true);
            }
        });
        on_click(&app, "assemble-btn", |a| {
            let _ = a.session.begin_assembly();
        });
        on_click(&app, "reset-btn", |a| {
            a.session.reset_game();
            set_hidden("cover", false);
        });
        on_click(&app, "mute-btn", |a| {
            a.unlock_audio();
            if let Some(audio) = a.audio.as_mut() {
                let muted = audio.toggle_mute();
                if let Some(btn) = by_id("mute-btn") {
                    set_class(&btn, "muted", muted);
                }
            }
        });
        on_click(&app, "message-close", |a| a.session.close_message());
        on_click(&app, "message-body", |a| a.session.skip_message());
        on_click(&app, "secret-close", |a| {
            let _ = a.session.dismiss_secret();
        });

        // Virtual pad buttons feed the secret recognizer too
        let Some(document) = document() else { return };
        let Ok(buttons) = document.query_selector_all("[data-token]") else { return };
        for i in 0..buttons.length() {
            let Some(node) = buttons.get(i) else { continue };
            let Ok(btn) = node.dyn_into::<Element>() else { continue };
            let Some(token) = btn.get_attribute("data-token") else { continue };
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                let mut a = app.borrow_mut();
                a.session.submit_input_token(&token);
                a.flush();
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Envelope id under a pointer event target
    fn target_item(event: &PointerEvent) -> Option<ItemId> {
        let target = event.target()?.dyn_into::<Element>().ok()?;
        let envelope = target.closest(".envelope").ok()??;
        envelope.get_attribute("data-id")?.parse().ok()
    }

    fn is_star(event: &PointerEvent) -> bool {
        event
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .and_then(|el| el.closest("#star").ok().flatten())
            .is_some()
    }

    fn setup_pointer_handlers(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else { return };

        // Press: pick up an envelope or the star
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut a = app.borrow_mut();
                if is_star(&event) {
                    let _ = a.session.grab_topper();
                } else if let Some(id) = target_item(&event) {
                    let pos = client_pos(&event);
                    if a.session.press_item(id, pos, now_secs()) {
                        event.prevent_default();
                        if let Some(status) = a.session.item_status(id) {
                            a.drag_offset = status.layout.pos - to_scene(pos.x, pos.y);
                        }
                    }
                }
                a.flush();
            });
            let _ = window.add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Move: drag the held thing, or rub a covered envelope
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut a = app.borrow_mut();
                let pos = client_pos(&event);
                let scene = to_scene(pos.x, pos.y);
                if a.session.topper().held {
                    a.session.drag_topper(scene);
                } else if let Some(id) = a.session.held_item() {
                    let offset = a.drag_offset;
                    a.session.set_drag_position(id, scene + offset);
                } else if let Some(id) = target_item(&event) {
                    a.session.rub(id);
                }
                a.flush();
            });
            let _ = window.add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Release: tap/drag classification or star placement
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut a = app.borrow_mut();
                if a.session.topper().held {
                    a.session.place_topper();
                } else {
                    a.session.release_item(client_pos(&event), now_secs());
                }
                a.flush();
            });
            let _ = window.add_event_listener_with_callback("pointerup", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Cancel: put the envelope back
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: PointerEvent| {
                let mut a = app.borrow_mut();
                a.session.cancel_drag();
                a.flush();
            });
            let _ = window.add_event_listener_with_callback("pointercancel", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_keyboard(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
            let mut a = app.borrow_mut();
            match event.key().as_str() {
                "Escape" => {
                    let _ = a.session.dismiss_secret();
                    a.session.close_message();
                }
                key => {
                    a.session.submit_input_token(key);
                }
            }
            a.flush();
        });
        let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |time: f64| {
            frame_loop(app, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn frame_loop(app: Rc<RefCell<App>>, time: f64) {
        {
            let mut a = app.borrow_mut();

            // Calculate delta time
            let dt = if a.last_time > 0.0 {
                ((time - a.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            a.last_time = time;

            a.update(dt);
            a.sync_dom();
            a.render_particles();
        }

        request_animation_frame(app);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_app::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Memory Tree (native) starting...");
    log::info!("The scene needs a browser - run with `trunk serve`; walking the session headless");

    if let Err(err) = walkthrough() {
        log::error!("Walkthrough failed: {}", err);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Play the whole session headless, uncovering and collecting in order
#[cfg(not(target_arch = "wasm32"))]
fn walkthrough() -> Result<(), Box<dyn std::error::Error>> {
    use memory_tree::consts::SIM_DT;
    use memory_tree::sim::{GameMode, Session};
    use memory_tree::{Catalog, Settings};

    let catalog = Catalog::builtin()?;
    let count = catalog.len() as u32;
    let settings = Settings::default();
    let star = settings.star_anchor;
    let mut session = Session::new(catalog, settings, 2024);

    session.start_game()?;
    for id in 1..=count {
        while session.item_status(id).is_some_and(|s| s.covered) {
            session.rub(id);
        }
        let outcome = session.attempt_collect(id);
        if let Some(item) = session.catalog().get(id) {
            println!("{:>2}. {:<24} {:?}", id, item.title, outcome);
        }
        session.tick(SIM_DT);
    }
    session.begin_assembly()?;
    session.finish_assembly()?;
    session.grab_topper()?;
    session.drag_topper(star);
    let placed = session.place_topper();
    let events = session.drain_events().len();

    println!(
        "Star placed: {} | mode: {:?} | {} events",
        placed,
        session.mode(),
        events
    );
    if session.mode() != GameMode::Completed {
        return Err("session did not complete".into());
    }
    Ok(())
}
