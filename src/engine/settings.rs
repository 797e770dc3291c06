//! The typed settings record that parameterizes layout and drawing.

use std::fmt;
use std::ops::RangeInclusive;

use log::warn;
use serde::{Deserialize, Serialize};

/// Valid `nodeSize` values.
pub const NODE_SIZE_RANGE: RangeInclusive<f64> = 4.0..=20.0;
/// Valid `linkDistance` values.
pub const LINK_DISTANCE_RANGE: RangeInclusive<f64> = 20.0..=100.0;
/// Valid `repulsion` values.
pub const REPULSION_RANGE: RangeInclusive<f64> = 50.0..=200.0;
/// Valid `attraction` values.
pub const ATTRACTION_RANGE: RangeInclusive<f64> = 0.05..=0.3;
/// Valid force step counts.
pub const ITERATIONS_RANGE: RangeInclusive<usize> = 0..=1000;
/// Valid link hit widths, in screen pixels.
pub const LINK_HIT_WIDTH_RANGE: RangeInclusive<f64> = 1.0..=20.0;

/// Placement algorithm requested by the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
	/// Iterative force-directed placement.
	#[default]
	Force,
	/// Nodes evenly spaced on one circle.
	Circular,
	/// Layered placement; falls back to circular.
	Hierarchical,
	/// Rows and columns; falls back to circular.
	Grid,
}

impl LayoutMode {
	/// The algorithm that actually runs for this mode.
	///
	/// Hierarchical and grid placement have no implementation yet and fall
	/// back to the circular seed placement.
	pub fn resolved(self) -> LayoutMode {
		match self {
			LayoutMode::Force => LayoutMode::Force,
			LayoutMode::Circular | LayoutMode::Hierarchical | LayoutMode::Grid => {
				LayoutMode::Circular
			}
		}
	}
}

impl fmt::Display for LayoutMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			LayoutMode::Force => "force",
			LayoutMode::Circular => "circular",
			LayoutMode::Hierarchical => "hierarchical",
			LayoutMode::Grid => "grid",
		})
	}
}

/// Every option of one view. Deserializing goes through [`SettingsPatch`],
/// so missing fields take their defaults and numbers are clamped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "SettingsPatch")]
pub struct Settings {
	/// Draw text labels under nodes.
	pub show_labels: bool,
	/// Keep nodes without links in the view.
	pub show_orphans: bool,
	/// Node radius in world units.
	pub node_size: f64,
	/// Rest length of link springs.
	pub link_distance: f64,
	/// Pairwise repulsion coefficient.
	pub repulsion: f64,
	/// Link spring coefficient.
	pub attraction: f64,
	/// Requested placement algorithm.
	pub layout: LayoutMode,
	/// Force steps per layout run.
	pub iterations: usize,
	/// Screen-space half width of the link hit band.
	pub link_hit_width: f64,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			show_labels: true,
			show_orphans: true,
			node_size: 8.0,
			link_distance: 50.0,
			repulsion: 100.0,
			attraction: 0.1,
			layout: LayoutMode::Force,
			iterations: 100,
			link_hit_width: 4.0,
		}
	}
}

/// A partial update to [`Settings`]; `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
	/// Replaces [`Settings::show_labels`].
	pub show_labels: Option<bool>,
	/// Replaces [`Settings::show_orphans`].
	pub show_orphans: Option<bool>,
	/// Replaces [`Settings::node_size`].
	pub node_size: Option<f64>,
	/// Replaces [`Settings::link_distance`].
	pub link_distance: Option<f64>,
	/// Replaces [`Settings::repulsion`].
	pub repulsion: Option<f64>,
	/// Replaces [`Settings::attraction`].
	pub attraction: Option<f64>,
	/// Replaces [`Settings::layout`].
	pub layout: Option<LayoutMode>,
	/// Replaces [`Settings::iterations`].
	pub iterations: Option<usize>,
	/// Replaces [`Settings::link_hit_width`].
	pub link_hit_width: Option<f64>,
}

/// A requested value that was pulled back into its valid range.
#[derive(Clone, Debug, PartialEq)]
pub struct Clamped {
	/// camelCase field name.
	pub field: &'static str,
	/// Value asked for.
	pub requested: f64,
	/// Value stored.
	pub applied: f64,
}

/// What applying a [`SettingsPatch`] changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SettingsChange {
	/// A field the layout depends on now holds a different value.
	pub layout_affecting: bool,
	/// Fields whose requested value was not stored as given.
	pub clamped: Vec<Clamped>,
}

impl From<&Settings> for SettingsPatch {
	fn from(s: &Settings) -> Self {
		Self {
			show_labels: Some(s.show_labels),
			show_orphans: Some(s.show_orphans),
			node_size: Some(s.node_size),
			link_distance: Some(s.link_distance),
			repulsion: Some(s.repulsion),
			attraction: Some(s.attraction),
			layout: Some(s.layout),
			iterations: Some(s.iterations),
			link_hit_width: Some(s.link_hit_width),
		}
	}
}

impl From<SettingsPatch> for Settings {
	fn from(patch: SettingsPatch) -> Self {
		let mut settings = Settings::default();
		settings.apply(&patch);
		settings
	}
}

impl Settings {
	/// Re-validates a full record against the defaults, clamping what is
	/// out of range. Non-finite numbers fall back to the default.
	pub fn clamped(&self) -> (Settings, SettingsChange) {
		let mut settings = Settings::default();
		let change = settings.apply(&SettingsPatch::from(self));
		(settings, change)
	}

	/// Applies `patch`, clamping out-of-range numbers instead of rejecting them.
	pub fn apply(&mut self, patch: &SettingsPatch) -> SettingsChange {
		let mut change = SettingsChange::default();

		if let Some(v) = patch.show_labels {
			self.show_labels = v;
		}
		if let Some(v) = patch.show_orphans {
			change.layout_affecting |= self.show_orphans != v;
			self.show_orphans = v;
		}
		if let Some(v) = patch.layout {
			change.layout_affecting |= self.layout != v;
			self.layout = v;
		}
		if let Some(v) = patch.iterations {
			let applied = v.clamp(*ITERATIONS_RANGE.start(), *ITERATIONS_RANGE.end());
			if applied != v {
				change.record("iterations", v as f64, applied as f64);
			}
			change.layout_affecting |= self.iterations != applied;
			self.iterations = applied;
		}

		let layout_fields: [(&'static str, Option<f64>, &mut f64, RangeInclusive<f64>); 4] = [
			("nodeSize", patch.node_size, &mut self.node_size, NODE_SIZE_RANGE),
			("linkDistance", patch.link_distance, &mut self.link_distance, LINK_DISTANCE_RANGE),
			("repulsion", patch.repulsion, &mut self.repulsion, REPULSION_RANGE),
			("attraction", patch.attraction, &mut self.attraction, ATTRACTION_RANGE),
		];
		for (field, requested, slot, range) in layout_fields {
			if let Some(requested) = requested {
				let applied = clamp_f64(field, requested, *slot, &range, &mut change);
				change.layout_affecting |= *slot != applied;
				*slot = applied;
			}
		}

		if let Some(requested) = patch.link_hit_width {
			self.link_hit_width = clamp_f64(
				"linkHitWidth",
				requested,
				self.link_hit_width,
				&LINK_HIT_WIDTH_RANGE,
				&mut change,
			);
		}

		change
	}
}

impl SettingsChange {
	fn record(&mut self, field: &'static str, requested: f64, applied: f64) {
		warn!("setting {field}={requested} out of range, using {applied}");
		self.clamped.push(Clamped {
			field,
			requested,
			applied,
		});
	}
}

/// NaN and infinities keep the current value.
fn clamp_f64(
	field: &'static str,
	requested: f64,
	current: f64,
	range: &RangeInclusive<f64>,
	change: &mut SettingsChange,
) -> f64 {
	let applied = if requested.is_finite() {
		requested.clamp(*range.start(), *range.end())
	} else {
		current
	};
	if applied != requested {
		change.record(field, requested, applied);
	}
	applied
}
