//! CAdESCOM / CAPICOM constants used when talking to the signing provider.
//! Values match the plugin's published enumerations; keep raw numbers here only.

// === Store location / name / open mode ===

/// `CAPICOM_LOCAL_MACHINE_STORE`
pub const CAPICOM_LOCAL_MACHINE_STORE: u32 = 1;

/// `CAPICOM_CURRENT_USER_STORE`
pub const CAPICOM_CURRENT_USER_STORE: u32 = 2;

/// `CAPICOM_MY_STORE` (personal certificates)
pub const CAPICOM_MY_STORE: &str = "My";

/// `CAPICOM_STORE_OPEN_READ_ONLY`
pub const CAPICOM_STORE_OPEN_READ_ONLY: u32 = 0;

/// `CAPICOM_STORE_OPEN_MAXIMUM_ALLOWED`
pub const CAPICOM_STORE_OPEN_MAXIMUM_ALLOWED: u32 = 2;

// === Certificate search ===

/// `CAPICOM_CERTIFICATE_FIND_SHA1_HASH`
pub const CAPICOM_CERTIFICATE_FIND_SHA1_HASH: u32 = 0;

// === Signing ===

/// `CADESCOM_STRING_TO_UCS2LE`
pub const CADESCOM_STRING_TO_UCS2LE: u32 = 0;

/// `CADESCOM_BASE64_TO_BINARY`
pub const CADESCOM_BASE64_TO_BINARY: u32 = 1;

/// `CADESCOM_CADES_BES`
pub const CADESCOM_CADES_BES: u32 = 1;

/// `CADESCOM_ENCODE_BASE64`
pub const CADESCOM_ENCODE_BASE64: u32 = 0;

/// `CADESCOM_ENCODE_BINARY`
pub const CADESCOM_ENCODE_BINARY: u32 = 1;

// === Front-end defaults ===

/// Loader script the page injects when the plugin object is missing
pub const DEFAULT_LOADER_SCRIPT: &str = "./vendor/cadesplugin_api.js";

/// Extension appended to the input file name for the saved signature
pub const SIGNATURE_EXTENSION: &str = "sig";

/// File name used when the input name is unknown
pub const DEFAULT_SIGNATURE_FILE_NAME: &str = "signature.sig";
