pub const INVENTORY_FILE: &str = "inventory.json";
pub const OCFL_LAYOUT_FILE: &str = "ocfl_layout.json";
pub const EXTENSIONS_DIR: &str = "extensions";
pub const EXTENSIONS_CONFIG_FILE: &str = "config.json";

pub const DEFAULT_CONTENT_DIR: &str = "content";
pub const DEFAULT_DIGEST_ALGORITHM: &str = "sha512";

pub const INVENTORY_TYPE_1_0: &str = "https://ocfl.io/1.0/spec/#inventory";
pub const INVENTORY_TYPE_1_1: &str = "https://ocfl.io/1.1/spec/#inventory";

pub const OBJECT_NAMASTE_1_0: &str = "0=ocfl_object_1.0";
pub const OBJECT_NAMASTE_1_1: &str = "0=ocfl_object_1.1";
pub const ROOT_NAMASTE_1_0: &str = "0=ocfl_1.0";
pub const ROOT_NAMASTE_1_1: &str = "0=ocfl_1.1";

pub const OBJECT_NAMASTE_CONTENT_1_0: &str = "ocfl_object_1.0\n";
pub const OBJECT_NAMASTE_CONTENT_1_1: &str = "ocfl_object_1.1\n";
pub const ROOT_NAMASTE_CONTENT_1_0: &str = "ocfl_1.0\n";
pub const ROOT_NAMASTE_CONTENT_1_1: &str = "ocfl_1.1\n";
