/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use crate::Guid;
use serde::{de, ser};
use std::fmt;

impl ser::Serialize for Guid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

struct GuidVisitor;

impl de::Visitor<'_> for GuidVisitor {
    type Value = Guid;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Guid, E> {
        Ok(Guid::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Guid, E> {
        Ok(Guid::from(v))
    }
}

impl<'de> de::Deserialize<'de> for Guid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        deserializer.deserialize_string(GuidVisitor)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_test::{assert_tokens, Token};

    #[test]
    fn test_serde() {
        let guid = Guid::from("abcdabcdabcd");
        assert_tokens(&guid, &[Token::Str("abcdabcdabcd")]);
    }
}
