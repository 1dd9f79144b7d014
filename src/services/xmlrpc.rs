//! XML-RPC codec: encodes `methodCall` documents and decodes `methodResponse` documents.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use crate::error::ImportError;

/// An XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    String(String),
    Double(f64),
    /// Raw `dateTime.iso8601` text
    DateTime(String),
    /// Raw base64 text
    Base64(String),
    Nil,
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
}

impl Value {
    /// Whether the remote side would treat this value as true.
    ///
    /// Zero, `false`, empty strings, nil and empty containers are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Bool(b) => *b,
            Value::String(s) | Value::DateTime(s) | Value::Base64(s) => !s.is_empty(),
            Value::Double(d) => *d != 0.0,
            Value::Nil => false,
            Value::Array(items) => !items.is_empty(),
            Value::Struct(members) => !members.is_empty(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) | Value::DateTime(s) | Value::Base64(s) => f.write_str(s),
            Value::Double(d) => write!(f, "{}", d),
            Value::Nil => f.write_str("nil"),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Struct(members) => {
                f.write_str("{")?;
                for (i, (name, value)) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(members: BTreeMap<String, Value>) -> Self {
        Value::Struct(members)
    }
}

/// Encode a method call document.
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    xml.push_str(&escape(method));
    xml.push_str("</methodName><params>");
    for param in params {
        xml.push_str("<param>");
        write_value(&mut xml, param);
        xml.push_str("</param>");
    }
    xml.push_str("</params></methodCall>\n");
    xml
}

fn write_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Int(n) => {
            // <int> is 32-bit on the wire
            if i32::try_from(*n).is_ok() {
                let _ = write!(out, "<int>{}</int>", n);
            } else {
                let _ = write!(out, "<i8>{}</i8>", n);
            }
        }
        Value::Bool(b) => {
            let _ = write!(out, "<boolean>{}</boolean>", u8::from(*b));
        }
        Value::String(s) => {
            let _ = write!(out, "<string>{}</string>", escape(s.as_str()));
        }
        Value::Double(d) => {
            let _ = write!(out, "<double>{}</double>", d);
        }
        Value::DateTime(s) => {
            let _ = write!(out, "<dateTime.iso8601>{}</dateTime.iso8601>", escape(s.as_str()));
        }
        Value::Base64(s) => {
            let _ = write!(out, "<base64>{}</base64>", escape(s.as_str()));
        }
        Value::Nil => out.push_str("<nil/>"),
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                let _ = write!(out, "<member><name>{}</name>", escape(name.as_str()));
                write_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

/// Decode a method response document.
///
/// A `<fault>` response becomes [`ImportError::Fault`].
pub fn decode_response(xml: &str) -> Result<Value, ImportError> {
    let mut parser = Parser::new(xml);
    parser.expect_start(b"methodResponse")?;

    match parser.significant()? {
        Token::Start(name) if name == b"params" => {
            parser.expect_start(b"param")?;
            parser.expect_start(b"value")?;
            let value = parser.value()?;
            parser.expect_end(b"param")?;
            parser.expect_end(b"params")?;
            parser.expect_end(b"methodResponse")?;
            Ok(value)
        }
        Token::Start(name) if name == b"fault" => {
            parser.expect_start(b"value")?;
            let detail = parser.value()?;
            Err(fault(detail))
        }
        other => Err(unexpected(&other)),
    }
}

fn fault(detail: Value) -> ImportError {
    match detail {
        Value::Struct(mut members) => ImportError::Fault {
            code: members
                .remove("faultCode")
                .map(|v| v.to_string())
                .unwrap_or_default(),
            message: members
                .remove("faultString")
                .map(|v| v.to_string())
                .unwrap_or_default(),
        },
        other => ImportError::Protocol(format!("fault detail is not a struct: {}", other)),
    }
}

/// Owned view of the XML events the decoder cares about.
#[derive(Debug)]
enum Token {
    Start(Vec<u8>),
    Empty(Vec<u8>),
    End(Vec<u8>),
    Text(String),
    Eof,
}

fn unexpected(token: &Token) -> ImportError {
    let found = match token {
        Token::Start(name) => format!("<{}>", String::from_utf8_lossy(name)),
        Token::Empty(name) => format!("<{}/>", String::from_utf8_lossy(name)),
        Token::End(name) => format!("</{}>", String::from_utf8_lossy(name)),
        Token::Text(text) => format!("text {:?}", text),
        Token::Eof => "end of document".to_string(),
    };
    ImportError::Protocol(format!("unexpected {}", found))
}

fn malformed(err: impl fmt::Display) -> ImportError {
    ImportError::Protocol(err.to_string())
}

struct Parser<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> Parser<'a> {
    fn new(xml: &'a str) -> Self {
        Self {
            reader: Reader::from_str(xml),
        }
    }

    /// Next token, including whitespace text.
    fn raw(&mut self) -> Result<Token, ImportError> {
        loop {
            let token = match self.reader.read_event().map_err(malformed)? {
                Event::Start(e) => Token::Start(e.name().as_ref().to_vec()),
                Event::Empty(e) => Token::Empty(e.name().as_ref().to_vec()),
                Event::End(e) => Token::End(e.name().as_ref().to_vec()),
                Event::Text(t) => Token::Text(t.unescape().map_err(malformed)?.into_owned()),
                Event::CData(c) => {
                    Token::Text(String::from_utf8(c.into_inner().into_owned()).map_err(malformed)?)
                }
                Event::Eof => Token::Eof,
                _ => continue,
            };
            return Ok(token);
        }
    }

    /// Next token, skipping whitespace between elements.
    fn significant(&mut self) -> Result<Token, ImportError> {
        loop {
            match self.raw()? {
                Token::Text(text) if text.trim().is_empty() => continue,
                token => return Ok(token),
            }
        }
    }

    fn expect_start(&mut self, tag: &[u8]) -> Result<(), ImportError> {
        match self.significant()? {
            Token::Start(name) if name == tag => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    fn expect_end(&mut self, tag: &[u8]) -> Result<(), ImportError> {
        match self.significant()? {
            Token::End(name) if name == tag => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Parse the rest of a `<value>` whose start tag was consumed.
    fn value(&mut self) -> Result<Value, ImportError> {
        let mut text = String::new();
        loop {
            match self.raw()? {
                Token::Text(t) => text.push_str(&t),
                // untyped values are strings
                Token::End(name) if name == b"value" => return Ok(Value::String(text)),
                Token::Start(name) => {
                    if !text.trim().is_empty() {
                        return Err(ImportError::Protocol("mixed content in <value>".to_string()));
                    }
                    let value = match name.as_slice() {
                        b"array" => self.array()?,
                        b"struct" => self.structure()?,
                        _ => {
                            let text = self.text_until(&name)?;
                            scalar(&name, text)?
                        }
                    };
                    self.expect_end(b"value")?;
                    return Ok(value);
                }
                Token::Empty(name) => {
                    if !text.trim().is_empty() {
                        return Err(ImportError::Protocol("mixed content in <value>".to_string()));
                    }
                    let value = match name.as_slice() {
                        b"array" => Value::Array(Vec::new()),
                        b"struct" => Value::Struct(BTreeMap::new()),
                        _ => scalar(&name, String::new())?,
                    };
                    self.expect_end(b"value")?;
                    return Ok(value);
                }
                other => return Err(unexpected(&other)),
            }
        }
    }

    /// Collect text up to the closing `tag`.
    fn text_until(&mut self, tag: &[u8]) -> Result<String, ImportError> {
        let mut text = String::new();
        loop {
            match self.raw()? {
                Token::Text(t) => text.push_str(&t),
                Token::End(name) if name == tag => return Ok(text),
                other => return Err(unexpected(&other)),
            }
        }
    }

    fn array(&mut self) -> Result<Value, ImportError> {
        let mut items = Vec::new();
        match self.significant()? {
            Token::Empty(name) if name == b"data" => {}
            Token::Start(name) if name == b"data" => loop {
                match self.significant()? {
                    Token::Start(name) if name == b"value" => items.push(self.value()?),
                    Token::Empty(name) if name == b"value" => items.push(Value::String(String::new())),
                    Token::End(name) if name == b"data" => break,
                    other => return Err(unexpected(&other)),
                }
            },
            other => return Err(unexpected(&other)),
        }
        self.expect_end(b"array")?;
        Ok(Value::Array(items))
    }

    fn structure(&mut self) -> Result<Value, ImportError> {
        let mut members = BTreeMap::new();
        loop {
            match self.significant()? {
                Token::End(name) if name == b"struct" => return Ok(Value::Struct(members)),
                Token::Start(name) if name == b"member" => {
                    let key = match self.significant()? {
                        Token::Start(name) if name == b"name" => self.text_until(b"name")?,
                        Token::Empty(name) if name == b"name" => String::new(),
                        other => return Err(unexpected(&other)),
                    };
                    let value = match self.significant()? {
                        Token::Start(name) if name == b"value" => self.value()?,
                        Token::Empty(name) if name == b"value" => Value::String(String::new()),
                        other => return Err(unexpected(&other)),
                    };
                    self.expect_end(b"member")?;
                    members.insert(key, value);
                }
                other => return Err(unexpected(&other)),
            }
        }
    }
}

fn scalar(tag: &[u8], text: String) -> Result<Value, ImportError> {
    match tag {
        b"int" | b"i4" | b"i8" => text
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|_| invalid("integer", &text)),
        b"boolean" => match text.trim() {
            "1" => Ok(Value::Bool(true)),
            "0" => Ok(Value::Bool(false)),
            _ => Err(invalid("boolean", &text)),
        },
        b"double" => text
            .trim()
            .parse()
            .map(Value::Double)
            .map_err(|_| invalid("double", &text)),
        b"string" => Ok(Value::String(text)),
        b"dateTime.iso8601" => Ok(Value::DateTime(text.trim().to_string())),
        b"base64" => Ok(Value::Base64(text.trim().to_string())),
        b"nil" => Ok(Value::Nil),
        other => Err(ImportError::Protocol(format!(
            "unknown value type <{}>",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn invalid(kind: &str, text: &str) -> ImportError {
    ImportError::Protocol(format!("invalid {} {:?}", kind, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(value: &str) -> String {
        format!(
            "<?xml version='1.0'?>\n<methodResponse>\n<params>\n<param>\n{}\n</param>\n</params>\n</methodResponse>\n",
            value
        )
    }

    #[test]
    fn test_encode_call_escapes_strings() {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Value::from("Smith & Sons <Ltd>"));
        let xml = encode_call("execute_kw", &[Value::from(7), Value::from(vec![Value::from(fields)])]);

        assert!(xml.starts_with("<?xml version=\"1.0\"?>"));
        assert!(xml.contains("<methodName>execute_kw</methodName>"));
        assert!(xml.contains("<param><value><int>7</int></value></param>"));
        assert!(xml.contains(
            "<array><data><value><struct><member><name>name</name>\
             <value><string>Smith &amp; Sons &lt;Ltd&gt;</string></value></member></struct></value></data></array>"
        ));
    }

    #[test]
    fn test_encode_wide_int_and_empty_struct() {
        let xml = encode_call("m", &[Value::Int(1 << 40), Value::Struct(BTreeMap::new()), Value::Bool(false)]);
        assert!(xml.contains("<i8>1099511627776</i8>"));
        assert!(xml.contains("<value><struct></struct></value>"));
        assert!(xml.contains("<boolean>0</boolean>"));
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode_response(&response("<value><int>42</int></value>")).unwrap(), Value::Int(42));
        assert_eq!(decode_response(&response("<value><i4>-3</i4></value>")).unwrap(), Value::Int(-3));
        assert_eq!(
            decode_response(&response("<value><boolean>0</boolean></value>")).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            decode_response(&response("<value>plain &amp; simple</value>")).unwrap(),
            Value::String("plain & simple".to_string())
        );
        assert_eq!(
            decode_response(&response("<value><string>  padded </string></value>")).unwrap(),
            Value::String("  padded ".to_string())
        );
        assert_eq!(decode_response(&response("<value><nil/></value>")).unwrap(), Value::Nil);
        assert_eq!(
            decode_response(&response("<value><string/></value>")).unwrap(),
            Value::String(String::new())
        );
    }

    #[test]
    fn test_decode_nested() {
        let xml = response(
            "<value><array><data>\n\
             <value><int>1</int></value>\n\
             <value><struct>\n\
               <member><name>server_version</name><value><string>17.0</string></value></member>\n\
               <member><name>ok</name><value><boolean>1</boolean></value></member>\n\
             </struct></value>\n\
             </data></array></value>",
        );
        let value = decode_response(&xml).unwrap();

        let mut members = BTreeMap::new();
        members.insert("server_version".to_string(), Value::from("17.0"));
        members.insert("ok".to_string(), Value::Bool(true));
        assert_eq!(value, Value::Array(vec![Value::Int(1), Value::Struct(members)]));
    }

    #[test]
    fn test_decode_fault() {
        let xml = "<?xml version='1.0'?>\n<methodResponse>\n<fault>\n<value><struct>\n\
                   <member>\n<name>faultCode</name>\n<value><int>1</int></value>\n</member>\n\
                   <member>\n<name>faultString</name>\n<value><string>Access Denied</string></value>\n</member>\n\
                   </struct></value>\n</fault>\n</methodResponse>\n";

        match decode_response(xml) {
            Err(ImportError::Fault { code, message }) => {
                assert_eq!(code, "1");
                assert_eq!(message, "Access Denied");
            }
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_response("<html>502</html>"), Err(ImportError::Protocol(_))));
        assert!(matches!(
            decode_response(&response("<value><int>forty</int></value>")),
            Err(ImportError::Protocol(_))
        ));
        assert!(matches!(
            decode_response(&response("<value><blob>x</blob></value>")),
            Err(ImportError::Protocol(_))
        ));
        assert!(matches!(decode_response(""), Err(ImportError::Protocol(_))));
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Int(42).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Array(vec![]).is_truthy());
        assert!(Value::Array(vec![Value::Int(0)]).is_truthy());
    }
}
