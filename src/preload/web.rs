//! Browser asset loader driving a `Preloader`

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlAudioElement, HtmlImageElement};

use super::{Manifest, Preloader};
use crate::error::LoadError;

/// Audio elements kept alive for playback, keyed by clip name
pub type ClipMap = Rc<RefCell<HashMap<String, HtmlAudioElement>>>;

/// Progress callback (percent 0-100)
pub type ProgressFn = Rc<dyn Fn(u8)>;

fn report(preloader: &Rc<RefCell<Preloader>>, on_progress: &ProgressFn, index: usize, outcome: Result<(), LoadError>) {
    let percent = preloader.borrow_mut().settle(index, outcome);
    if let Some(percent) = percent {
        on_progress(percent);
    }
}

/// Kick off every load in the manifest. Settlement is reported through
/// `preloader`; loaded audio elements land in the returned map.
pub fn start(manifest: &Manifest, preloader: Rc<RefCell<Preloader>>, on_progress: ProgressFn) -> ClipMap {
    let clips: ClipMap = Rc::new(RefCell::new(HashMap::new()));

    for (index, src) in manifest.images.iter().enumerate() {
        let Ok(img) = HtmlImageElement::new() else {
            report(&preloader, &on_progress, index, Err(LoadError::Image(src.clone())));
            continue;
        };

        let onload = {
            let preloader = preloader.clone();
            let on_progress = on_progress.clone();
            Closure::<dyn FnMut()>::new(move || {
                report(&preloader, &on_progress, index, Ok(()));
            })
        };
        let onerror = {
            let preloader = preloader.clone();
            let on_progress = on_progress.clone();
            let src = src.clone();
            Closure::<dyn FnMut()>::new(move || {
                report(&preloader, &on_progress, index, Err(LoadError::Image(src.clone())));
            })
        };
        img.set_onload(Some(onload.as_ref().unchecked_ref()));
        img.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onload.forget();
        onerror.forget();
        img.set_src(src);
    }

    let offset = manifest.images.len();
    for (i, source) in manifest.audio.iter().enumerate() {
        let index = offset + i;
        let failure = LoadError::Audio {
            name: source.name.clone(),
            src: source.src.clone(),
        };
        let Ok(audio) = HtmlAudioElement::new_with_src(&source.src) else {
            report(&preloader, &on_progress, index, Err(failure));
            continue;
        };
        audio.set_preload("auto");

        let ready = {
            let preloader = preloader.clone();
            let on_progress = on_progress.clone();
            Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                // canplaythrough may fire again after seeking; settle ignores repeats
                report(&preloader, &on_progress, index, Ok(()));
            })
        };
        let error = {
            let preloader = preloader.clone();
            let on_progress = on_progress.clone();
            let clips = clips.clone();
            let name = source.name.clone();
            Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                clips.borrow_mut().remove(&name);
                report(&preloader, &on_progress, index, Err(failure.clone()));
            })
        };
        let _ = audio.add_event_listener_with_callback("canplaythrough", ready.as_ref().unchecked_ref());
        let _ = audio.add_event_listener_with_callback("error", error.as_ref().unchecked_ref());
        ready.forget();
        error.forget();

        audio.load();
        clips.borrow_mut().insert(source.name.clone(), audio);
    }

    clips
}
