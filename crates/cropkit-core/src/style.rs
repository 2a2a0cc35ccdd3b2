//! Presentation defaults and caller overrides.
//!
//! Values are layout hints for whatever host renders the [`CropView`]; they
//! are not validated. Overrides replace defaults field by field.
//!
//! [`CropView`]: crate::session::CropView

use serde::{Deserialize, Serialize};

macro_rules! style_fields {
    ($( $(#[$meta:meta])* $field:ident: $ty:ty = $default:expr, )*) => {
        /// Fully resolved presentation values.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct Style {
            $( $(#[$meta])* pub $field: $ty, )*
        }

        impl Default for Style {
            fn default() -> Self {
                Self {
                    $( $field: $default, )*
                }
            }
        }

        /// Partial presentation overrides; unset fields keep the default.
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default, rename_all = "camelCase")]
        pub struct StyleOverrides {
            $( $(#[$meta])* #[serde(skip_serializing_if = "Option::is_none")] pub $field: Option<$ty>, )*
        }

        impl Style {
            /// Apply `overrides` on top of this style.
            pub fn merge(&self, overrides: &StyleOverrides) -> Style {
                Style {
                    $( $field: overrides.$field.clone().unwrap_or_else(|| self.$field.clone()), )*
                }
            }
        }
    };
}

style_fields! {
    /// Container width; `None` fills the parent.
    container_width: Option<f32> = None,
    container_height: f32 = 400.0,
    cropper_width: f32 = 300.0,
    cropper_height: f32 = 300.0,
    cropper_margin_bottom: f32 = 16.0,
    /// Horizontal space between the two controls.
    button_gap: f32 = 16.0,
    button_padding_horizontal: f32 = 20.0,
    button_padding_vertical: f32 = 10.0,
    button_radius: f32 = 8.0,
    button_min_width: f32 = 80.0,
    cancel_color: String = "#ff6b6b".to_string(),
    confirm_color: String = "#4ecdc4".to_string(),
    disabled_color: String = "#ccc".to_string(),
    text_color: String = "white".to_string(),
    font_size: f32 = 16.0,
    font_bold: bool = true,
}

impl StyleOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
