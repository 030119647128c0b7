use std::borrow::Cow;
use std::fmt::Display;

use md5::{Digest, Md5};

use crate::SID_KEY;

/// Computes the `sig` parameter of an API call.
///
/// The signed text is the viewer id, then every `key=value` pair in
/// ascending key order (`sid` excluded), then the secret. The signature is
/// the lowercase hex MD5 of that text.
///
/// Values must already be rendered to text; see [`to_params`](crate::to_params).
pub fn sign<I, K, V>(viewer_id: impl Display, params: I, secret: &str) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    hex::encode(Md5::digest(signature_base(viewer_id, params, secret).as_bytes()))
}

pub(crate) fn signature_base<I, K, V>(viewer_id: impl Display, params: I, secret: &str) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut sorted: Vec<(K, V)> = params.into_iter().collect();
    sorted.sort_by(|(a, _), (b, _)| {
        let (a, b): (&str, &str) = (a.as_ref(), b.as_ref());
        a.cmp(b)
    });

    let mut base = viewer_id.to_string();
    for (key, value) in &sorted {
        let key: &str = key.as_ref();
        if key != SID_KEY {
            base.push_str(key);
            base.push('=');
            base.push_str(value.as_ref());
        }
    }
    base.push_str(secret);
    base
}

/// Signing identity of one viewer: the viewer id and the application secret.
#[derive(Debug, Clone)]
pub struct Signer<'a> {
    viewer_id: Cow<'a, str>,
    secret: Cow<'a, str>,
}

impl<'a> Signer<'a> {
    pub fn new<TViewer, TSecret>(viewer_id: TViewer, secret: TSecret) -> Self
    where
        TViewer: Into<Cow<'a, str>>,
        TSecret: Into<Cow<'a, str>>,
    {
        Signer {
            viewer_id: viewer_id.into(),
            secret: secret.into(),
        }
    }

    pub fn generate_signature<I, K, V>(&self, params: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        sign(&self.viewer_id, params, &self.secret)
    }
}
