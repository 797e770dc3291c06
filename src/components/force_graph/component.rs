use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::error;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::ForceGraphState;
use crate::engine::{Entity, Graph, Point, SettingsPatch};

type SharedState = Rc<RefCell<Option<ForceGraphState>>>;

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

/// Pointer position relative to the canvas' top-left corner.
fn canvas_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<Point> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?;
	let rect = canvas.get_bounding_client_rect();
	Some(Point::new(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

fn with_state(state: &SharedState, f: impl FnOnce(&mut ForceGraphState)) {
	if let Some(ref mut s) = *state.borrow_mut() {
		f(s);
	}
}

/// Canvas view over a [`Graph`], driven by a [`crate::engine::GraphEngine`].
#[component]
pub fn ForceGraphCanvas(
	#[prop(into)] data: Signal<Graph>,
	#[prop(optional)] settings: Option<Signal<SettingsPatch>>,
	#[prop(optional)] on_select: Option<Callback<Entity>>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: SharedState = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (state_init, animate_init, resize_cb_init) =
		(state.clone(), animate.clone(), resize_cb.clone());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window).unwrap_or((800.0, 600.0))
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = match canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into().ok())
		{
			Some(ctx) => ctx,
			None => {
				error!("canvas has no 2d context");
				return;
			}
		};

		let patch = settings.map(|s| s.get_untracked()).unwrap_or_default();
		match ForceGraphState::new(data.get_untracked(), &patch, w, h) {
			Ok(mut s) => {
				if let Some(cb) = on_select {
					s.engine.set_click_handler(move |entity| cb.run(entity.clone()));
				}
				*state_init.borrow_mut() = Some(s);
			}
			Err(err) => {
				error!("graph view disabled: {err}");
				return;
			}
		}

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				with_state(&state_resize, |s| {
					if let Err(err) = s.resize(nw, nh) {
						error!("resize ignored: {err}");
					}
				});
			}));
			if let Some(ref cb) = *resize_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			with_state(&state_anim, |s| {
				s.tick(0.016);
				render::render(s, &ctx);
			});
			if let (Some(cb), Some(win)) = (&*animate_inner.borrow(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let state_data = state.clone();
	Effect::new(move |_| {
		let graph = data.get();
		with_state(&state_data, |s| {
			if let Err(err) = s.set_graph(graph) {
				error!("graph update rejected: {err}");
			}
		});
	});

	if let Some(settings) = settings {
		let state_settings = state.clone();
		Effect::new(move |_| {
			let patch = settings.get();
			with_state(&state_settings, |s| {
				s.engine.set_settings(&patch);
			});
		});
	}

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		if let Some(p) = canvas_point(canvas_ref, &ev) {
			with_state(&state_md, |s| s.pointer_down(p));
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		if let Some(p) = canvas_point(canvas_ref, &ev) {
			with_state(&state_mm, |s| s.pointer_move(p));
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |ev: MouseEvent| {
		if let Some(p) = canvas_point(canvas_ref, &ev) {
			with_state(&state_mu, |s| s.pointer_up(p));
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		with_state(&state_ml, |s| s.pointer_leave());
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		if let Some(p) = canvas_point(canvas_ref, &ev) {
			with_state(&state_wh, |s| s.wheel(ev.delta_y(), p));
		}
	};

	let state_fit = state.clone();
	let on_fit = move |_: MouseEvent| {
		with_state(&state_fit, |s| {
			s.engine.fit_to_content();
		});
	};

	let state_reset = state.clone();
	let on_reset = move |_: MouseEvent| {
		with_state(&state_reset, |s| s.engine.reset_view());
	};

	view! {
		<div class="force-graph">
			<canvas
				node_ref=canvas_ref
				class="force-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				style="display: block; cursor: grab;"
			/>
			<div class="force-graph-controls">
				<button on:click=on_fit>"Fit"</button>
				<button on:click=on_reset>"Reset"</button>
			</div>
		</div>
	}
}
