// vim: tw=80
use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote, ToTokens};
use syn::{
    *,
    spanned::Spanned
};

/// How a method receives `self`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Receiver {
    Ref,
    RefMut,
    Static,
}

/// How the original implementation receives an argument.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Passing {
    Value,
    Ref,
    RefMut,
}

struct Arg {
    /// The owned type the engine's value converts back into.
    owned: Type,
    passing: Passing,
}

enum Output {
    Unit,
    /// `Result<T, E>`.  Thrown values become `Err(E)`.
    Result(Type, Type),
    Value(Type),
}

pub(crate) struct MockMethod {
    sig: Signature,
    receiver: Receiver,
    args: Vec<Arg>,
    output: Output,
    default: Option<Block>,
}

fn unsupported<T: ToTokens>(t: T, what: &str) -> Error {
    Error::new_spanned(t, format!("shmock does not support {}", what))
}

/// The owned type used to carry a `&T` argument: `&str` becomes `String` and
/// `&[T]` becomes `Vec<T>`.
fn owned_type(elem: &Type) -> Result<Type> {
    match elem {
        Type::Path(tp) if tp.qself.is_none() && tp.path.is_ident("str") => {
            Ok(parse_quote!(::std::string::String))
        },
        Type::Slice(ts) => {
            let elem = &ts.elem;
            Ok(parse_quote!(::std::vec::Vec<#elem>))
        },
        Type::TraitObject(_) => {
            Err(unsupported(elem, "trait object arguments"))
        },
        Type::ImplTrait(_) => Err(unsupported(elem, "impl Trait arguments")),
        _ => Ok(elem.clone())
    }
}

fn classify_arg(ty: &Type) -> Result<Arg> {
    match ty {
        Type::Reference(r) if r.mutability.is_some() => {
            match &*r.elem {
                Type::Slice(_) => {
                    Err(unsupported(ty, "`&mut` slice arguments"))
                },
                Type::Path(tp) if tp.path.is_ident("str") => {
                    Err(unsupported(ty, "`&mut str` arguments"))
                },
                elem => Ok(Arg {
                    owned: owned_type(elem)?,
                    passing: Passing::RefMut
                })
            }
        },
        Type::Reference(r) => {
            Ok(Arg{owned: owned_type(&r.elem)?, passing: Passing::Ref})
        },
        Type::ImplTrait(_) => Err(unsupported(ty, "impl Trait arguments")),
        _ => Ok(Arg{owned: ty.clone(), passing: Passing::Value})
    }
}

fn classify_output(rt: &ReturnType) -> Result<Output> {
    let ty = match rt {
        ReturnType::Default => return Ok(Output::Unit),
        ReturnType::Type(_, ty) => ty
    };
    match &**ty {
        Type::Tuple(tt) if tt.elems.is_empty() => Ok(Output::Unit),
        Type::Reference(_) => {
            Err(unsupported(ty, "methods that return references"))
        },
        Type::ImplTrait(_) => {
            Err(unsupported(ty, "methods that return impl Trait"))
        },
        Type::Path(tp) if tp.qself.is_none() => {
            let last = tp.path.segments.last();
            if let Some(seg) = last.filter(|seg| seg.ident == "Result") {
                if let PathArguments::AngleBracketed(ab) = &seg.arguments {
                    let types = ab.args.iter()
                        .filter_map(|ga| match ga {
                            GenericArgument::Type(t) => Some(t.clone()),
                            _ => None
                        }).collect::<Vec<_>>();
                    if let [t, e] = &types[..] {
                        return Ok(Output::Result(t.clone(), e.clone()));
                    }
                }
            }
            Ok(Output::Value((**ty).clone()))
        },
        _ => Ok(Output::Value((**ty).clone()))
    }
}

impl MockMethod {
    pub fn new(f: TraitItemFn) -> Result<Self> {
        let sig = f.sig;
        if let Some(a) = &sig.asyncness {
            return Err(unsupported(a, "async methods"));
        }
        if let Some(v) = &sig.variadic {
            return Err(unsupported(v, "variadic methods"));
        }
        for param in sig.generics.params.iter() {
            if !matches!(param, GenericParam::Lifetime(_)) {
                return Err(unsupported(param, "generic methods"));
            }
        }
        let mut receiver = Receiver::Static;
        let mut args = Vec::new();
        for input in sig.inputs.iter() {
            match input {
                FnArg::Receiver(r) => {
                    if r.colon_token.is_some() {
                        return Err(unsupported(r, "arbitrary self types"));
                    }
                    receiver = match (&r.reference, &r.mutability) {
                        (None, _) => {
                            return Err(unsupported(r,
                                "methods that take self by value"));
                        },
                        (Some(_), None) => Receiver::Ref,
                        (Some(_), Some(_)) => Receiver::RefMut,
                    };
                },
                FnArg::Typed(pt) => args.push(classify_arg(&pt.ty)?)
            }
        }
        let output = classify_output(&sig.output)?;
        Ok(MockMethod {
            sig,
            receiver,
            args,
            output,
            default: f.default
        })
    }

    pub fn name(&self) -> String {
        self.sig.ident.to_string()
    }

    fn arg_idents(&self) -> Vec<Ident> {
        (0..self.args.len())
            .map(|i| format_ident!("__shmock_arg{}", i))
            .collect()
    }

    fn original_ident(&self) -> Ident {
        format_ident!("__shmock_original_{}", self.sig.ident)
    }

    /// The default body, kept as an inherent method of the mock struct.
    pub fn gen_original(&self) -> TokenStream {
        match &self.default {
            Some(block) => {
                let mut sig = self.sig.clone();
                sig.ident = self.original_ident();
                quote!(
                    #[allow(unused, clippy::all)]
                    #sig #block
                )
            },
            None => TokenStream::new()
        }
    }

    /// The closure that runs the original implementation on the chain's
    /// argument list.
    fn gen_original_closure(&self, mock_ident: &Ident, ctx: &str)
        -> TokenStream
    {
        if self.default.is_none() {
            return TokenStream::new();
        }
        let idents = self.arg_idents();
        let lets = self.args.iter().zip(idents.iter()).enumerate()
            .map(|(i, (arg, ident))| {
                let owned = &arg.owned;
                let i = Literal::usize_unsuffixed(i);
                let mutability = if arg.passing == Passing::RefMut {
                    quote!(mut)
                } else {
                    TokenStream::new()
                };
                quote!(
                    let #mutability #ident: #owned =
                        ::shmock::__private::arg(#ctx, __shmock_args, #i)?;
                )
            });
        let call_args = self.args.iter().zip(idents.iter())
            .map(|(arg, ident)| match arg.passing {
                Passing::Value => quote!(#ident),
                Passing::Ref => quote!(&#ident),
                Passing::RefMut => quote!(&mut #ident),
            });
        let receiver = match self.receiver {
            Receiver::Static => TokenStream::new(),
            Receiver::Ref => quote!(self,),
            Receiver::RefMut => quote!(&mut *self,),
        };
        let write_backs = self.args.iter().zip(idents.iter()).enumerate()
            .filter(|(_, (arg, _))| arg.passing == Passing::RefMut)
            .map(|(i, (_, ident))| {
                let i = Literal::usize_unsuffixed(i);
                quote!(
                    __shmock_args[#i] = ::shmock::ToValue::to_value(&#ident);
                )
            });
        let wrap = match self.output {
            Output::Result(..) => quote!(::shmock::__private::ok_result),
            _ => quote!(::shmock::__private::ok_value)
        };
        let original_ident = self.original_ident();
        quote!(
            let mut __shmock_original = |__shmock_args: &mut [::shmock::Value]|
                -> ::std::result::Result<::shmock::Value, ::shmock::CallError>
            {
                #(#lets)*
                let __shmock_ret =
                    #mock_ident::#original_ident(#receiver #(#call_args),*);
                #(#write_backs)*
                #wrap(__shmock_ret)
            };
        )
    }

    /// The method's implementation on the mock struct.
    pub fn gen_impl(&self, target: &str, mock_ident: &Ident) -> TokenStream {
        let name = self.name();
        let ctx = format!("{}::{}", target, name);
        let idents = self.arg_idents();
        let mut sig = self.sig.clone();
        let typed = sig.inputs.iter_mut().filter_map(|input| match input {
            FnArg::Typed(pt) => Some(pt),
            FnArg::Receiver(_) => None
        });
        for (pt, ident) in typed.zip(idents.iter()) {
            let span = pt.pat.span();
            *pt.pat = Pat::Ident(PatIdent {
                attrs: Vec::new(),
                by_ref: None,
                mutability: None,
                ident: Ident::new(&ident.to_string(), span),
                subpat: None
            });
        }
        let handle = match self.receiver {
            Receiver::Static => {
                quote!(::shmock::__private::installed::<#mock_ident>())
            },
            _ => quote!(::std::clone::Clone::clone(&self.shmock))
        };
        let original = self.gen_original_closure(mock_ident, &ctx);
        let original_arg = if self.default.is_some() {
            quote!(::std::option::Option::Some(&mut __shmock_original))
        } else {
            quote!(::std::option::Option::None)
        };
        let write_backs = self.args.iter().zip(idents.iter()).enumerate()
            .filter(|(_, (arg, _))| arg.passing == Passing::RefMut)
            .map(|(i, (_, ident))| {
                let i = Literal::usize_unsuffixed(i);
                quote!(
                    ::shmock::__private::write_back(#ctx, #ident,
                        &__shmock_args, #i);
                )
            });
        let finish = match &self.output {
            Output::Unit => quote!(
                ::shmock::__private::finish::<()>(#ctx, __shmock_result)
            ),
            Output::Result(t, e) => quote!(
                ::shmock::__private::finish_result::<#t, #e>(#ctx,
                    __shmock_result)
            ),
            Output::Value(t) => quote!(
                ::shmock::__private::finish::<#t>(#ctx, __shmock_result)
            ),
        };
        quote!(
            #sig {
                let __shmock_handle: ::shmock::Handle = #handle;
                let mut __shmock_args: ::std::vec::Vec<::shmock::Value> =
                    ::std::vec![#(::shmock::ToValue::to_value(&#idents)),*];
                #original
                let __shmock_result = __shmock_handle.intercept(#name,
                    &mut __shmock_args, #original_arg);
                #(#write_backs)*
                #finish
            }
        )
    }
}
