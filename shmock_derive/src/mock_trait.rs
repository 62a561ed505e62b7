// vim: tw=80
use proc_macro2::TokenStream;
use quote::quote;
use syn::*;

use crate::{
    gen_mock_ident,
    mock_method::MockMethod,
};

pub(crate) struct MockTrait {
    /// Name of the mocked trait
    ident: Ident,
    /// Name of the generated mock struct
    mock_ident: Ident,
    methods: Vec<MockMethod>,
    vis: Visibility,
}

impl MockTrait {
    /// Collect every unsupported item of the trait into a single error.
    pub fn new(item: ItemTrait) -> Result<Self> {
        let mut errors: Option<Error> = None;
        let mut push = |e: Error| match errors.as_mut() {
            Some(errors) => errors.combine(e),
            None => errors = Some(e)
        };
        if !item.generics.params.is_empty() {
            push(Error::new_spanned(&item.generics,
                "shmock does not support generic traits"));
        }
        let mut methods = Vec::new();
        for ti in item.items.into_iter() {
            match ti {
                TraitItem::Fn(f) => match MockMethod::new(f) {
                    Ok(m) => methods.push(m),
                    Err(e) => push(e)
                },
                TraitItem::Const(c) => push(Error::new_spanned(c,
                    "shmock does not support associated constants")),
                TraitItem::Type(t) => push(Error::new_spanned(t,
                    "shmock does not support associated types")),
                other => push(Error::new_spanned(other,
                    "shmock does not support this kind of trait item")),
            }
        }
        match errors {
            Some(e) => Err(e),
            None => Ok(MockTrait {
                mock_ident: gen_mock_ident(&item.ident),
                ident: item.ident,
                methods,
                vis: item.vis,
            })
        }
    }

    /// Generate the mock struct and its implementations
    pub fn gen(&self) -> TokenStream {
        let ident = &self.ident;
        let mock_ident = &self.mock_ident;
        let vis = &self.vis;
        let target = ident.to_string();
        let doc = format!("Mock implementation of [`{}`].", target);
        let names = self.methods.iter().map(MockMethod::name);
        let originals = self.methods.iter().map(MockMethod::gen_original);
        let impls = self.methods.iter()
            .map(|m| m.gen_impl(&target, mock_ident));
        quote!(
            #[doc = #doc]
            #[derive(Clone, Debug)]
            #vis struct #mock_ident {
                shmock: ::shmock::Handle,
            }
            impl #mock_ident {
                #[doc = "A controller for instances of this mock."]
                pub fn shmock() -> ::shmock::Shmock<Self> {
                    ::shmock::Shmock::new()
                }
                #[doc = "A controller for this mock's static methods."]
                pub fn shmock_static() -> ::shmock::Shmock<Self> {
                    ::shmock::Shmock::new_static()
                }
                #(#originals)*
            }
            impl ::shmock::Synthesize for #mock_ident {
                fn target() -> &'static str {
                    #target
                }
                fn methods()
                    -> ::std::option::Option<&'static [&'static str]>
                {
                    ::std::option::Option::Some(&[#(#names),*])
                }
                fn synthesize(handle: ::shmock::Handle) -> Self {
                    #mock_ident { shmock: handle }
                }
                fn static_slot() -> &'static ::std::thread::LocalKey<
                    ::std::cell::RefCell<
                        ::std::option::Option<::shmock::Handle>>>
                {
                    ::std::thread_local! {
                        static SLOT: ::std::cell::RefCell<
                            ::std::option::Option<::shmock::Handle>> =
                            const { ::std::cell::RefCell::new(
                                ::std::option::Option::None) };
                    }
                    &SLOT
                }
            }
            impl ::shmock::ToValue for #mock_ident {
                fn to_value(&self) -> ::shmock::Value {
                    ::shmock::Value::Mock(
                        ::std::clone::Clone::clone(&self.shmock))
                }
            }
            impl ::shmock::FromValue for #mock_ident {
                fn from_value(value: ::shmock::Value)
                    -> ::std::result::Result<Self, ::shmock::ValueError>
                {
                    match value {
                        ::shmock::Value::Mock(handle) => {
                            ::std::result::Result::Ok(
                                #mock_ident { shmock: handle })
                        },
                        other => ::std::result::Result::Err(
                            ::shmock::ValueError::new(&other, #target))
                    }
                }
            }
            impl #ident for #mock_ident {
                #(#impls)*
            }
        )
    }
}
