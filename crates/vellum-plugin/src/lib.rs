//! # Vellum Plugins
//!
//! Feature plugins built on the core engine, and the catalog that turns a
//! configuration into an ordered descriptor list.
//!
//! ## Plugin Types
//!
//! 1. **Formatting plugins** (`align`, `font_family`): change block styles
//!    and commit a history step
//! 2. **Insertion plugins** (`emoji`, `replace`): edit text and keep the
//!    cursor where the user expects it
//! 3. **Normalization plugins** (`marker`, `hint`): repair the document
//!    after every change and clean it before it is saved
//! 4. **Assembly plugins** (`toolbar`, `powerbox`): gather what the others
//!    contribute and expose it through a capability
//!
//! ## Learning: Composition Without References
//!
//! No plugin here knows another feature plugin. They only talk to the core
//! capabilities they declare and to resource keys: the toolbar never
//! imports the align plugin, it just reads `toolbar_items`.

pub mod align;
pub mod catalog;
pub mod emoji;
pub mod font_family;
pub mod hint;
pub mod marker;
pub mod powerbox;
pub mod replace;
pub mod toolbar;

pub use align::{Alignment, AlignPlugin};
pub use catalog::{Catalog, CatalogError};
pub use emoji::EmojiPlugin;
pub use font_family::FontFamilyPlugin;
pub use hint::HintPlugin;
pub use marker::MarkerPlugin;
pub use powerbox::{PowerboxApi, PowerboxPlugin};
pub use replace::ReplacePlugin;
pub use toolbar::{ToolbarApi, ToolbarButton, ToolbarPlugin, ToolbarSection};
