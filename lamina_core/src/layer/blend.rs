// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Blend modes.

/// How a layer's pixels combine with what is already in its render target.
///
/// Only [`SrcOver`](Self::SrcOver) and the separable/non-separable modes of
/// CSS compositing are valid on a layer; see
/// [`is_allowed_for_layers`](Self::is_allowed_for_layers).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BlendMode {
    /// Porter-Duff clear.
    Clear,
    /// Porter-Duff source.
    Src,
    /// Porter-Duff destination.
    Dst,
    /// Standard source-over alpha compositing.
    #[default]
    SrcOver,
    /// Porter-Duff destination-over.
    DstOver,
    /// Porter-Duff source-in.
    SrcIn,
    /// Porter-Duff destination-in.
    DstIn,
    /// Porter-Duff source-out.
    SrcOut,
    /// Porter-Duff destination-out.
    DstOut,
    /// Porter-Duff source-atop.
    SrcATop,
    /// Porter-Duff destination-atop.
    DstATop,
    /// Porter-Duff xor.
    Xor,
    /// Additive.
    Plus,
    /// Component-wise multiply of premultiplied values.
    Modulate,
    /// Screen.
    Screen,
    /// Overlay.
    Overlay,
    /// Darken.
    Darken,
    /// Lighten.
    Lighten,
    /// Color dodge.
    ColorDodge,
    /// Color burn.
    ColorBurn,
    /// Hard light.
    HardLight,
    /// Soft light.
    SoftLight,
    /// Difference.
    Difference,
    /// Exclusion.
    Exclusion,
    /// Multiply.
    Multiply,
    /// Hue.
    Hue,
    /// Saturation.
    Saturation,
    /// Color.
    Color,
    /// Luminosity.
    Luminosity,
}

impl BlendMode {
    /// Returns true for modes a layer may use.
    #[must_use]
    pub const fn is_allowed_for_layers(self) -> bool {
        matches!(
            self,
            Self::SrcOver
                | Self::Screen
                | Self::Overlay
                | Self::Darken
                | Self::Lighten
                | Self::ColorDodge
                | Self::ColorBurn
                | Self::HardLight
                | Self::SoftLight
                | Self::Difference
                | Self::Exclusion
                | Self::Multiply
                | Self::Hue
                | Self::Saturation
                | Self::Color
                | Self::Luminosity
        )
    }

    /// Returns true for anything other than plain source-over.
    #[inline]
    #[must_use]
    pub const fn is_non_default(self) -> bool {
        !matches!(self, Self::SrcOver)
    }
}
