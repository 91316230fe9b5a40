use darling::{ast, FromDeriveInput, FromField};
use proc_macro2::TokenTree;
use quote::{format_ident, quote, ToTokens};
use syn::{parse_quote, punctuated::Punctuated, Attribute, Meta, Token};

#[derive(Debug, FromDeriveInput)]
#[darling(supports(struct_named), forward_attrs)]
struct ModelInputReceiver {
	ident: syn::Ident,

	generics: syn::Generics,

	data: ast::Data<(), ModelFieldReceiver>,

	attrs: Vec<syn::Attribute>,
}

#[derive(Debug, FromField)]
#[darling(forward_attrs)]
struct ModelFieldReceiver {
	ident: Option<syn::Ident>,

	ty: syn::Type,
	vis: syn::Visibility,

	attrs: Vec<syn::Attribute>,
}

/// Whether the field is marked `#[serde(skip_deserializing)]` or `#[serde(skip)]`.
fn is_skipped(attrs: &[Attribute]) -> bool {
	attrs.iter().any(|attr| {
		let Meta::List(ref list) = attr.meta else {
			return false;
		};

		if !list.path.is_ident("serde") {
			return false;
		}

		list.tokens.to_token_stream().into_iter().any(|token| {
			matches!(token, TokenTree::Ident(ref ident) if ident == "skip_deserializing" || ident == "skip")
		})
	})
}

/// Copies an attribute onto an input struct, dropping database-only parts.
///
/// `#[sqlx(..)]` attributes are removed and `FromRow` is taken out of derive lists.
fn input_attr(attr: &Attribute) -> Option<Attribute> {
	if attr.path().is_ident("sqlx") {
		return None;
	}

	if !attr.path().is_ident("derive") {
		return Some(attr.clone());
	}

	let Ok(paths) = attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated) else {
		return Some(attr.clone());
	};

	let kept = paths
		.into_iter()
		.filter(|path| {
			path.segments
				.last()
				.map_or(true, |segment| segment.ident != "FromRow")
		})
		.collect::<Vec<_>>();

	if kept.is_empty() {
		None
	} else {
		Some(parse_quote!(#[derive(#(#kept),*)]))
	}
}

pub fn from_input(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
	let input = syn::parse_macro_input!(input as syn::DeriveInput);
	let receiver = match ModelInputReceiver::from_derive_input(&input) {
		Ok(x) => x,
		Err(e) => return e.write_errors().into(),
	};

	let ident = &receiver.ident;
	let vis = &input.vis;
	let generics = &receiver.generics;
	let create_ident = format_ident!("Create{}Input", ident);
	let update_ident = format_ident!("Update{}Input", ident);

	let attrs = receiver
		.attrs
		.iter()
		.filter_map(input_attr)
		.collect::<Vec<_>>();

	let Some(fields) = receiver.data.take_struct() else {
		return syn::Error::new_spanned(ident, "#[model] only supports structs with named fields")
			.into_compile_error()
			.into();
	};

	let fields = fields
		.iter()
		.filter_map(|field| {
			let ident = field.ident.as_ref()?;

			if is_skipped(&field.attrs) {
				return None;
			}

			let attrs = field
				.attrs
				.iter()
				.filter_map(input_attr)
				.collect::<Vec<_>>();

			Some((attrs, ident, &field.ty, &field.vis))
		})
		.collect::<Vec<_>>();

	let create_fields = fields.iter().map(|(attrs, ident, ty, vis)| {
		quote! {
			#(#attrs)*
			#vis #ident: #ty,
		}
	});

	let update_fields = fields.iter().map(|(attrs, ident, ty, vis)| {
		quote! {
			#(#attrs)*
			#vis #ident: Option<#ty>,
		}
	});

	quote! {
		#input

		#(#attrs)*
		#vis struct #create_ident #generics {
			#(
				#create_fields
			)*
		}

		#(#attrs)*
		#vis struct #update_ident #generics {
			#(
				#update_fields
			)*
		}
	}
	.into()
}
