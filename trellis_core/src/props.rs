// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node property vocabulary: origins, property names and sets, and the
//! option bag accepted by [`Scene::set`](crate::scene::Scene::set).

use core::fmt;
use core::ops::{BitOr, BitOrAssign};

/// The reference point of a node along one axis.
///
/// The origin is the pivot for position, rotation, and scale: `left`/`top`
/// name the location of this point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Origin {
    /// The left (or top) edge.
    #[default]
    Start,
    /// The middle.
    Center,
    /// The right (or bottom) edge.
    End,
    /// A fractional position, `0.0` at the start edge and `1.0` at the end.
    Fraction(f64),
}

impl Origin {
    /// Offset of this origin from the box center, as a fraction of the box
    /// extent (`-0.5..=0.5` for in-box origins).
    #[must_use]
    pub fn offset(self) -> f64 {
        match self {
            Self::Start => -0.5,
            Self::Center => 0.0,
            Self::End => 0.5,
            Self::Fraction(f) => f - 0.5,
        }
    }

    /// Parses a keyword (`left`, `top`, `center`, `right`, `bottom`).
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "left" | "top" => Some(Self::Start),
            "center" => Some(Self::Center),
            "right" | "bottom" => Some(Self::End),
            _ => None,
        }
    }
}

/// A named node property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PropertyName {
    /// Horizontal position of the origin point.
    Left,
    /// Vertical position of the origin point.
    Top,
    /// Horizontal scale.
    ScaleX,
    /// Vertical scale.
    ScaleY,
    /// Horizontal shear.
    SkewX,
    /// Vertical shear.
    SkewY,
    /// Rotation.
    Angle,
    /// Horizontal mirroring.
    FlipX,
    /// Vertical mirroring.
    FlipY,
    /// Horizontal origin.
    OriginX,
    /// Vertical origin.
    OriginY,
    /// Intrinsic width.
    Width,
    /// Intrinsic height.
    Height,
    /// Stroke width (enlarges the box).
    StrokeWidth,
    /// Fill paint (owned by the drawing collaborator).
    Fill,
    /// Stroke paint (owned by the drawing collaborator).
    Stroke,
    /// Opacity applied at blit time.
    Opacity,
    /// Any other drawn content (path data, image, text).
    Content,
    /// Visibility.
    Visible,
}

impl PropertyName {
    /// All property names, in declaration order.
    pub const ALL: [Self; 19] = [
        Self::Left,
        Self::Top,
        Self::ScaleX,
        Self::ScaleY,
        Self::SkewX,
        Self::SkewY,
        Self::Angle,
        Self::FlipX,
        Self::FlipY,
        Self::OriginX,
        Self::OriginY,
        Self::Width,
        Self::Height,
        Self::StrokeWidth,
        Self::Fill,
        Self::Stroke,
        Self::Opacity,
        Self::Content,
        Self::Visible,
    ];

    /// The camel-case key used by [`NodeOptions::set_named`].
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Top => "top",
            Self::ScaleX => "scaleX",
            Self::ScaleY => "scaleY",
            Self::SkewX => "skewX",
            Self::SkewY => "skewY",
            Self::Angle => "angle",
            Self::FlipX => "flipX",
            Self::FlipY => "flipY",
            Self::OriginX => "originX",
            Self::OriginY => "originY",
            Self::Width => "width",
            Self::Height => "height",
            Self::StrokeWidth => "strokeWidth",
            Self::Fill => "fill",
            Self::Stroke => "stroke",
            Self::Opacity => "opacity",
            Self::Content => "content",
            Self::Visible => "visible",
        }
    }
}

/// A set of [`PropertyName`]s stored as a bit mask.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PropertySet(u32);

impl PropertySet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Properties that feed the node's own matrix or local box.
    pub const GEOMETRY: Self = Self::EMPTY
        .with(PropertyName::Left)
        .with(PropertyName::Top)
        .with(PropertyName::ScaleX)
        .with(PropertyName::ScaleY)
        .with(PropertyName::SkewX)
        .with(PropertyName::SkewY)
        .with(PropertyName::Angle)
        .with(PropertyName::FlipX)
        .with(PropertyName::FlipY)
        .with(PropertyName::OriginX)
        .with(PropertyName::OriginY)
        .with(PropertyName::Width)
        .with(PropertyName::Height)
        .with(PropertyName::StrokeWidth);

    /// Properties whose change invalidates a cached bitmap by default.
    ///
    /// Position, rotation, scale, and opacity are applied when the bitmap is
    /// drawn and are not part of this set. Scale still participates in the
    /// cache key through the effective resolution.
    pub const DEFAULT_CACHE: Self = Self::EMPTY
        .with(PropertyName::Width)
        .with(PropertyName::Height)
        .with(PropertyName::StrokeWidth)
        .with(PropertyName::Fill)
        .with(PropertyName::Stroke)
        .with(PropertyName::Content);

    /// Returns a set containing only `name`.
    #[inline]
    #[must_use]
    pub const fn single(name: PropertyName) -> Self {
        Self(1 << name as u32)
    }

    /// Returns this set with `name` added.
    #[inline]
    #[must_use]
    pub const fn with(self, name: PropertyName) -> Self {
        Self(self.0 | (1 << name as u32))
    }

    /// Adds `name` to the set.
    #[inline]
    pub fn insert(&mut self, name: PropertyName) {
        self.0 |= 1 << name as u32;
    }

    /// Returns `true` if `name` is in the set.
    #[inline]
    #[must_use]
    pub const fn contains(self, name: PropertyName) -> bool {
        self.0 & (1 << name as u32) != 0
    }

    /// Returns `true` if the two sets share any member.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns the members present in both sets.
    #[inline]
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Returns `true` if the set is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates over the members in declaration order.
    pub fn iter(self) -> impl Iterator<Item = PropertyName> {
        PropertyName::ALL
            .into_iter()
            .filter(move |name| self.contains(*name))
    }
}

impl BitOr for PropertySet {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PropertySet {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<PropertyName> for PropertySet {
    #[inline]
    fn from(name: PropertyName) -> Self {
        Self::single(name)
    }
}

impl FromIterator<PropertyName> for PropertySet {
    fn from_iter<I: IntoIterator<Item = PropertyName>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for name in iter {
            set.insert(name);
        }
        set
    }
}

impl fmt::Debug for PropertySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(PropertyName::key)).finish()
    }
}

/// A dynamically typed option value for [`NodeOptions::set_named`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OptionValue<'a> {
    /// A number.
    Number(f64),
    /// A boolean.
    Bool(bool),
    /// A keyword, such as an origin name.
    Keyword(&'a str),
}

/// A partial update of node properties.
///
/// Fields left as `None` are not touched.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NodeOptions {
    /// Horizontal position of the origin point.
    pub left: Option<f64>,
    /// Vertical position of the origin point.
    pub top: Option<f64>,
    /// Horizontal scale (clamped to `>= 0`).
    pub scale_x: Option<f64>,
    /// Vertical scale (clamped to `>= 0`).
    pub scale_y: Option<f64>,
    /// Horizontal shear in degrees.
    pub skew_x: Option<f64>,
    /// Vertical shear in degrees.
    pub skew_y: Option<f64>,
    /// Rotation in degrees.
    pub angle: Option<f64>,
    /// Horizontal mirroring.
    pub flip_x: Option<bool>,
    /// Vertical mirroring.
    pub flip_y: Option<bool>,
    /// Horizontal origin.
    pub origin_x: Option<Origin>,
    /// Vertical origin.
    pub origin_y: Option<Origin>,
    /// Intrinsic width (clamped to `>= 0`).
    pub width: Option<f64>,
    /// Intrinsic height (clamped to `>= 0`).
    pub height: Option<f64>,
    /// Stroke width (clamped to `>= 0`).
    pub stroke_width: Option<f64>,
    /// Visibility.
    pub visible: Option<bool>,
    /// Whether the node may keep its own render cache.
    pub object_caching: Option<bool>,
}

impl NodeOptions {
    /// Creates an empty option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `left` and `top`.
    #[must_use]
    pub fn position(mut self, left: f64, top: f64) -> Self {
        self.left = Some(left);
        self.top = Some(top);
        self
    }

    /// Sets `width` and `height`.
    #[must_use]
    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Sets both scale factors.
    #[must_use]
    pub fn scale(mut self, scale_x: f64, scale_y: f64) -> Self {
        self.scale_x = Some(scale_x);
        self.scale_y = Some(scale_y);
        self
    }

    /// Sets both shear angles.
    #[must_use]
    pub fn skew(mut self, skew_x: f64, skew_y: f64) -> Self {
        self.skew_x = Some(skew_x);
        self.skew_y = Some(skew_y);
        self
    }

    /// Sets the rotation angle.
    #[must_use]
    pub fn angle(mut self, angle: f64) -> Self {
        self.angle = Some(angle);
        self
    }

    /// Sets both mirroring flags.
    #[must_use]
    pub fn flip(mut self, flip_x: bool, flip_y: bool) -> Self {
        self.flip_x = Some(flip_x);
        self.flip_y = Some(flip_y);
        self
    }

    /// Sets both origins.
    #[must_use]
    pub fn origin(mut self, origin_x: Origin, origin_y: Origin) -> Self {
        self.origin_x = Some(origin_x);
        self.origin_y = Some(origin_y);
        self
    }

    /// Sets the stroke width.
    #[must_use]
    pub fn stroke_width(mut self, stroke_width: f64) -> Self {
        self.stroke_width = Some(stroke_width);
        self
    }

    /// Sets visibility.
    #[must_use]
    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    /// Enables or disables the node's own render cache.
    #[must_use]
    pub fn object_caching(mut self, enabled: bool) -> Self {
        self.object_caching = Some(enabled);
        self
    }

    /// Sets an option by its camel-case key.
    ///
    /// Returns `false` (and changes nothing) when the key is not recognized or
    /// the value has the wrong type. Callers feeding options from an external
    /// document can pass every key they have; unknown ones are skipped.
    pub fn set_named(&mut self, key: &str, value: OptionValue<'_>) -> bool {
        match (key, value) {
            ("left", OptionValue::Number(v)) => self.left = Some(v),
            ("top", OptionValue::Number(v)) => self.top = Some(v),
            ("scaleX", OptionValue::Number(v)) => self.scale_x = Some(v),
            ("scaleY", OptionValue::Number(v)) => self.scale_y = Some(v),
            ("skewX", OptionValue::Number(v)) => self.skew_x = Some(v),
            ("skewY", OptionValue::Number(v)) => self.skew_y = Some(v),
            ("angle", OptionValue::Number(v)) => self.angle = Some(v),
            ("flipX", OptionValue::Bool(v)) => self.flip_x = Some(v),
            ("flipY", OptionValue::Bool(v)) => self.flip_y = Some(v),
            ("originX", OptionValue::Keyword(k)) => match Origin::from_keyword(k) {
                Some(o) => self.origin_x = Some(o),
                None => return false,
            },
            ("originY", OptionValue::Keyword(k)) => match Origin::from_keyword(k) {
                Some(o) => self.origin_y = Some(o),
                None => return false,
            },
            ("originX", OptionValue::Number(v)) => self.origin_x = Some(Origin::Fraction(v)),
            ("originY", OptionValue::Number(v)) => self.origin_y = Some(Origin::Fraction(v)),
            ("width", OptionValue::Number(v)) => self.width = Some(v),
            ("height", OptionValue::Number(v)) => self.height = Some(v),
            ("strokeWidth", OptionValue::Number(v)) => self.stroke_width = Some(v),
            ("visible", OptionValue::Bool(v)) => self.visible = Some(v),
            ("objectCaching", OptionValue::Bool(v)) => self.object_caching = Some(v),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_offsets() {
        assert_eq!(Origin::Start.offset(), -0.5);
        assert_eq!(Origin::Center.offset(), 0.0);
        assert_eq!(Origin::End.offset(), 0.5);
        assert_eq!(Origin::Fraction(0.25).offset(), -0.25);
        assert_eq!(Origin::from_keyword("bottom"), Some(Origin::End));
        assert_eq!(Origin::from_keyword("middle"), None);
    }

    #[test]
    fn property_set_operations() {
        let mut set = PropertySet::single(PropertyName::Left);
        set.insert(PropertyName::Fill);
        assert!(set.contains(PropertyName::Left));
        assert!(!set.contains(PropertyName::Top));
        assert!(set.intersects(PropertySet::DEFAULT_CACHE));
        assert_eq!(
            set.intersection(PropertySet::DEFAULT_CACHE),
            PropertySet::single(PropertyName::Fill)
        );
        let names: alloc::vec::Vec<_> = set.iter().collect();
        assert_eq!(names, [PropertyName::Left, PropertyName::Fill]);
    }

    #[test]
    fn position_and_rotation_are_not_cache_affecting() {
        let moved: PropertySet = [PropertyName::Left, PropertyName::Top, PropertyName::Angle]
            .into_iter()
            .collect();
        assert!(!moved.intersects(PropertySet::DEFAULT_CACHE));
    }

    #[test]
    fn named_options_ignore_unknown_keys() {
        let mut opts = NodeOptions::new();
        assert!(opts.set_named("left", OptionValue::Number(4.0)));
        assert!(opts.set_named("originX", OptionValue::Keyword("center")));
        assert!(opts.set_named("flipY", OptionValue::Bool(true)));
        assert!(!opts.set_named("shadow", OptionValue::Number(1.0)));
        assert!(!opts.set_named("angle", OptionValue::Bool(true)));
        assert!(!opts.set_named("originY", OptionValue::Keyword("sideways")));
        assert_eq!(opts.left, Some(4.0));
        assert_eq!(opts.origin_x, Some(Origin::Center));
        assert_eq!(opts.flip_y, Some(true));
        assert_eq!(opts.angle, None);
        assert_eq!(opts.origin_y, None);
    }

    #[test]
    fn builder_sets_fields() {
        let opts = NodeOptions::new()
            .position(1.0, 2.0)
            .size(3.0, 4.0)
            .angle(45.0);
        assert_eq!(opts.left, Some(1.0));
        assert_eq!(opts.height, Some(4.0));
        assert_eq!(opts.angle, Some(45.0));
        assert_eq!(opts.scale_x, None);
    }
}
