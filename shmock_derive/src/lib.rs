// vim: tw=80
//! Proc Macros for use with Shmock
//!
//! You probably don't want to use this crate directly.  Instead, you use its
//! reexports via the [`shmock`](../shmock/index.html) crate.

extern crate proc_macro;

use proc_macro2::TokenStream;

mod mock_method;
mod mock_trait;
use crate::mock_trait::MockTrait;

/// Generate a mock identifier from the regular one: eg "Foo" => "MockFoo"
fn gen_mock_ident(ident: &syn::Ident) -> syn::Ident {
    syn::Ident::new(&format!("Mock{}", ident), ident.span())
}

fn do_shmock(attrs: TokenStream, input: TokenStream) -> TokenStream {
    if !attrs.is_empty() {
        return syn::Error::new_spanned(attrs,
            "#[shmock] does not take any arguments").to_compile_error();
    }
    let item: syn::ItemTrait = match syn::parse2(input) {
        Ok(item) => item,
        Err(e) => {
            let msg = format!("#[shmock] can only mock traits: {}", e);
            return syn::Error::new(e.span(), msg).to_compile_error();
        }
    };
    match MockTrait::new(item) {
        Ok(mock) => mock.gen(),
        Err(e) => e.to_compile_error()
    }
}

/// Generate a mock for a trait.
///
/// The trait itself is left unchanged.  Next to it, the attribute generates
/// a struct named after the trait with "Mock" prepended, which implements
/// the trait by routing every call through a
/// [`Shmock`](../shmock/struct.Shmock.html) controller.  Create one with
/// `MockFoo::shmock()`, or with `MockFoo::shmock_static()` for the trait's
/// static methods.
///
/// Methods that have a default body keep it as their original
/// implementation.  It runs for calls that match no expectation, and for
/// expectations that ask for it.
///
/// # Examples
///
/// ```ignore
/// use shmock::*;
///
/// #[shmock]
/// pub trait Foo {
///     fn foo(&self, key: i16) -> u32;
///     fn bar(&self) -> u32 {
///         self.foo(1) + 1
///     }
/// }
///
/// let mut ctrl = MockFoo::shmock();
/// ctrl.expect("foo", args![1]).return_value(41);
/// let foo = ctrl.replay().unwrap();
/// assert_eq!(42, foo.bar());
/// ```
///
/// # Limitations
///
/// Arguments and return values must implement
/// [`ToValue`](../shmock/trait.ToValue.html) and
/// [`FromValue`](../shmock/trait.FromValue.html).  Generic traits, generic
/// methods, `async` methods, associated types and constants, methods that
/// take `self` by value, and methods that return references are rejected.
///
/// ```ignore
/// #[shmock]   // error: shmock does not support associated types
/// trait Foo {
///     type Item;
///     fn next(&mut self) -> Option<u32>;
/// }
/// ```
#[proc_macro_attribute]
pub fn shmock(attrs: proc_macro::TokenStream, input: proc_macro::TokenStream)
    -> proc_macro::TokenStream
{
    let input: proc_macro2::TokenStream = input.into();
    let mut output = input.clone();
    output.extend(do_shmock(attrs.into(), input));
    output.into()
}

/// Remove all whitespace, so token streams that differ only in `Spacing`
/// compare equal.
#[cfg(test)]
fn squash(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}
