//! Procedural macros for objrpc
//!
//! # `#[method]`
//!
//! Turns an async fn into a factory for an exposed method, with argument
//! binding and result encoding generated from the signature. Without the
//! macro you'd write:
//!
//! ```ignore
//! pub fn close_spider() -> Box<dyn Method> {
//!     from_typed_fn(|args: CloseArgs| async move {
//!         Ok(format!("closing {}", args.spider))
//!     })
//! }
//! ```
//!
//! With it:
//!
//! ```ignore
//! #[objrpc::method]
//! pub async fn close_spider(args: CloseArgs) -> Result<String> {
//!     Ok(format!("closing {}", args.spider))
//! }
//!
//! let engine = ObjectNode::builder()
//!     .method("close_spider", close_spider())
//!     .build();
//! ```

mod method;

use proc_macro::TokenStream;

/// Attribute macro for defining exposed methods
///
/// Generates `fn name() -> Box<dyn objrpc_server::Method>` with the same
/// visibility and attributes as the annotated fn.
///
/// # Arguments
///
/// - no arguments: params must be absent or `[]`
/// - one argument: params deserialize into its type, so a struct takes
///   named params and a `Vec` or tuple takes positional ones
/// - several arguments: positional params, bound in order
///
/// # Return Type
///
/// `objrpc_core::Result<T>` with `T: Serialize`. An `Err` becomes an
/// INTERNAL_ERROR response; use `Error::raised` to include a trace.
///
/// # Limitations
///
/// - async free functions only (no `self`, no generics)
#[proc_macro_attribute]
pub fn method(_attr: TokenStream, item: TokenStream) -> TokenStream {
    method::method_impl(item)
}
