//! Stream URL resolution.
//!
//! Stream descriptors in a player response are not always directly
//! fetchable. Some carry their URL inside a query-string blob together with
//! a scrambled signature, and nearly all carry an `n` parameter that must be
//! rewritten before the platform serves the stream at full speed. Both
//! rewrites are done by functions found in the player program:
//!
//! * [`decipher_script`] locates the signature descrambling routine and its
//!   helper object
//! * [`n_param_script`] locates the `n` parameter routine
//! * [`resolve_url`] applies both to a [`StreamDescriptor`]
//!
//! Extraction is marker based and tied to how the player program is
//! currently laid out. When a marker goes missing, extraction fails with an
//! [`ErrorKind::Extraction`](crate::error::ErrorKind::Extraction) error that
//! names the missing part; a partial transform is never returned.

use url::{form_urlencoded, Url};

use crate::{
    error::{Error, Result},
    protocol::player::StreamDescriptor,
    transform::{CompiledTransform, Limits, TransformKind},
    util::{extract, set_query_param},
};

/// Precedes the invocation of the descrambling routine in the bootstrap code.
const DECIPHER_ANCHOR: &str = r#"a.set("alr","yes");c&&(c="#;

/// Precedes the invocation of the `n` parameter routine.
const N_PARAM_ANCHOR: &str = r#"&&(b=a.get("n"))&&(b="#;

/// Terminates an extracted function body.
const BODY_END: &str = "};";

/// Query key of the signature when the blob does not name one.
const DEFAULT_SIGNATURE_PARAM: &str = "signature";

/// Extracts the signature descrambling routine from `player` and compiles
/// it.
///
/// # Errors
///
/// Returns an extraction error naming the first part that could not be
/// found:
/// * the routine's name
/// * the routine itself
/// * the name of its helper object
/// * the helper object itself
///
/// Returns an evaluation error if the synthesized program does not compile.
pub fn decipher_script(player: &str, limits: Limits) -> Result<CompiledTransform> {
    let name = extract(player, DECIPHER_ANCHOR, "(decodeURI")
        .ok_or_else(|| Error::extraction("decipher function name not found"))?;

    let body = extract(player, &format!("{name}=function(a){{"), BODY_END)
        .ok_or_else(|| Error::extraction("decipher function not found"))?;

    let helper = extract(body, r#"a=a.split("");"#, ".")
        .ok_or_else(|| Error::extraction("manipulations object name not found"))?;

    let helper_body = extract(player, &format!("var {helper}={{"), BODY_END)
        .ok_or_else(|| Error::extraction("manipulations object not found"))?;

    debug!("decipher function {name} uses helper object {helper}");

    let prelude =
        format!("const {helper} = {{ {helper_body} }};const decipher = (a) => {{ {body} }};");
    CompiledTransform::compile(TransformKind::Decipher, &prelude, "decipher", limits)
}

/// Extracts the `n` parameter routine from `player` and compiles it.
///
/// The routine is called through an alias such as `Xy[0]`; the array named
/// by the alias lists the routine's real name.
///
/// # Errors
///
/// Returns an extraction error if the alias, the routine's name or the
/// routine itself cannot be found, and an evaluation error if the
/// synthesized program does not compile.
pub fn n_param_script(player: &str, limits: Limits) -> Result<CompiledTransform> {
    let alias = extract(player, N_PARAM_ANCHOR, "(b)")
        .ok_or_else(|| Error::extraction("`n` parameter function alias not found"))?;

    // Strip the index: `Xy[0]` is looked up as `var Xy=[`.
    let name = alias
        .len()
        .checked_sub(3)
        .and_then(|end| alias.get(..end))
        .filter(|array| !array.is_empty())
        .and_then(|array| extract(player, &format!("var {array}=["), "]"))
        .ok_or_else(|| Error::extraction("`n` parameter function name not found"))?;

    let body = extract(player, &format!("{name}=function(a){{"), BODY_END)
        .ok_or_else(|| Error::extraction("`n` parameter function not found"))?;

    debug!("`n` parameter function {name} called as {alias}");

    let prelude = format!("const nParam = (a) => {{ {body} }};");
    CompiledTransform::compile(TransformKind::NParam, &prelude, "nParam", limits)
}

/// Resolves a stream descriptor into a fetchable URL.
///
/// A descriptor with a direct URL only has its `n` parameter rewritten.
/// Otherwise its signature cipher is taken apart: the signature, if any, is
/// descrambled and set on the URL under the parameter name the cipher asks
/// for, after which the `n` parameter is rewritten.
///
/// # Errors
///
/// Returns a structural error if the descriptor holds no URL, and an
/// evaluation error if a transform fails.
pub fn resolve_url(
    descriptor: &StreamDescriptor,
    decipher: &CompiledTransform,
    n_param: &CompiledTransform,
) -> Result<String> {
    if let Some(url) = descriptor.url.as_deref() {
        return apply_n_param(url, n_param);
    }

    let cipher = descriptor
        .signature_cipher
        .as_deref()
        .ok_or_else(|| Error::structural("audio format URL not found"))?;

    let url = apply_decipher(cipher, decipher)?;
    apply_n_param(&url, n_param)
}

/// Takes a signature cipher apart and sets the descrambled signature on its
/// URL.
fn apply_decipher(cipher: &str, decipher: &CompiledTransform) -> Result<String> {
    let mut url = None;
    let mut signature = None;
    let mut signature_param = None;

    for (key, value) in form_urlencoded::parse(cipher.as_bytes()) {
        let slot = match key.as_ref() {
            "url" => &mut url,
            "s" => &mut signature,
            "sp" => &mut signature_param,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }

    let url = url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| Error::structural("audio format URL not found"))?;

    let Some(signature) = signature.filter(|s| !s.is_empty()) else {
        return Ok(url);
    };

    let signature_param = signature_param
        .filter(|sp| !sp.is_empty())
        .unwrap_or_else(|| DEFAULT_SIGNATURE_PARAM.to_owned());

    let mut url = parse_stream_url(&url)?;
    set_query_param(&mut url, &signature_param, &decipher.apply(&signature)?);

    Ok(url.into())
}

/// Rewrites the `n` parameter of `url`, if it has one.
fn apply_n_param(url: &str, n_param: &CompiledTransform) -> Result<String> {
    let mut components = parse_stream_url(url)?;
    let n = components
        .query_pairs()
        .find(|(key, _)| key == "n")
        .map(|(_, value)| value.into_owned());

    match n.filter(|n| !n.is_empty()) {
        Some(n) => {
            set_query_param(&mut components, "n", &n_param.apply(&n)?);
            Ok(components.into())
        }
        None => Ok(url.to_owned()),
    }
}

fn parse_stream_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| Error::structural(format!("malformed stream URL: {e}")))
}
