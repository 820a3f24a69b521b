//! String array extraction.
//!
//! Selected string literals are moved into a single array and replaced by
//! calls to an accessor function taking the entry index. Entries can be stored
//! plain, base64 encoded or rc4 encrypted; each encoding in use gets its own
//! accessor. With rotation enabled the array is stored rotated and a small
//! routine at program start rotates it back.

use crate::encoding::{encode_base64, encode_rc4, KEY_ALPHABET, KEY_LENGTH};
use crate::options::StringArrayEncoding;
use crate::template::{hex, instantiate, render};
use crate::{Result, Transform};
use indexmap::IndexMap;
use jscloak_core::ast::{Expr, Lit, Program, Stmt};
use jscloak_core::printer::quote_string;
use jscloak_core::visit::{walk_expr, walk_expr_mut, walk_program, Visit, VisitMut};
use rand::prelude::{IndexedRandom, SliceRandom};
use rand::{rngs::StdRng, Rng};
use std::collections::HashSet;
use tracing::debug;

const ARRAY: &str = "var {{arr}}=[{{items}}];";

const ROTATE: &str = "(function(a,n){while(n--){a.push(a.shift());}})({{arr}},{{count}});";

const PLAIN_ACCESSOR: &str = "function {{acc}}(i){return {{arr}}[i];}";

const BASE64_ACCESSOR: &str = "function {{acc}}(i){return {{utf8}}({{b64}}({{arr}}[i]));}";

const RC4_ACCESSOR: &str = "function {{acc}}(i,key){\
var data={{b64}}({{arr}}[i]);var s=[],j=0,x,out='';\
for(var k=0;k<256;k++){s[k]=k;}\
for(k=0;k<256;k++){j=(j+s[k]+key.charCodeAt(k%key.length))%256;x=s[k];s[k]=s[j];s[j]=x;}\
k=0;j=0;\
for(var y=0;y<data.length;y++){k=(k+1)%256;j=(j+s[k])%256;x=s[k];s[k]=s[j];s[j]=x;\
out+=String.fromCharCode(data.charCodeAt(y)^s[(s[k]+s[j])%256]);}\
return {{utf8}}(out);}";

const BASE64_DECODER: &str = "function {{b64}}(s){\
var a='ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/';\
var o='';var buf=0;var bits=0;\
for(var i=0;i<s.length;i++){var c=a.indexOf(s.charAt(i));if(c<0){continue;}\
buf=((buf<<6)|c)&0xffffff;bits+=6;\
if(bits>=8){bits-=8;o+=String.fromCharCode((buf>>bits)&0xff);}}\
return o;}";

const UTF8_DECODER: &str = "function {{utf8}}(s){var r='';\
for(var i=0;i<s.length;i++){r+='%'+('00'+s.charCodeAt(i).toString(16)).slice(-2);}\
return decodeURIComponent(r);}";

/// One distinct string in the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEntry {
    /// Logical index used by call sites.
    pub index: usize,
    pub encoding: StringArrayEncoding,
    /// Per-entry key, present for rc4 entries.
    pub key: Option<String>,
}

/// Ordered, deduplicated strings with stable logical indices.
#[derive(Debug, Default, Clone)]
pub struct StringLiteralPool {
    entries: IndexMap<String, PoolEntry>,
}

impl StringLiteralPool {
    /// Returns the entry for `value`, creating it with `encoding` and `key`
    /// if the value is new.
    pub fn intern(
        &mut self,
        value: &str,
        encoding: StringArrayEncoding,
        key: Option<String>,
    ) -> &PoolEntry {
        let index = self.entries.len();
        self.entries
            .entry(value.to_string())
            .or_insert(PoolEntry {
                index,
                encoding,
                key,
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, value: &str) -> Option<&PoolEntry> {
        self.entries.get(value)
    }

    /// Entries in logical order as they are stored in the emitted array.
    pub fn stored(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(value, entry)| match (entry.encoding, &entry.key) {
                (StringArrayEncoding::Base64, _) => encode_base64(value),
                (StringArrayEncoding::Rc4, Some(key)) => encode_rc4(value, key),
                _ => value.clone(),
            })
            .collect()
    }

    /// Encodings in use, in order of first use.
    pub fn encodings(&self) -> Vec<StringArrayEncoding> {
        let mut seen = Vec::new();
        for entry in self.entries.values() {
            if !seen.contains(&entry.encoding) {
                seen.push(entry.encoding);
            }
        }
        seen
    }
}

/// Moves string literals into an indexed, optionally encoded array.
#[derive(Debug)]
pub struct StringArray {
    threshold: f64,
    encodings: Vec<StringArrayEncoding>,
    rotate: bool,
}

impl StringArray {
    pub fn new(threshold: f64, encodings: Vec<StringArrayEncoding>, rotate: bool) -> Self {
        let encodings = if encodings.is_empty() {
            vec![StringArrayEncoding::None]
        } else {
            encodings
        };
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            encodings,
            rotate,
        }
    }

    fn preamble(
        &self,
        program: &mut Program,
        rng: &mut StdRng,
        pool: &StringLiteralPool,
        accessors: &IndexMap<StringArrayEncoding, String>,
    ) -> Result<Vec<Stmt>> {
        let array = program.fresh_name("arr");
        let mut stored = pool.stored();

        let rotation = (self.rotate && stored.len() > 1).then(|| rng.random_range(100..=500usize));
        if let Some(count) = rotation {
            let n = stored.len();
            stored.rotate_right(count % n);
        }

        let items = stored
            .iter()
            .map(|s| quote_string(s, false))
            .collect::<Vec<_>>()
            .join(",");
        let mut src = render(ARRAY, &[("arr", array.as_str()), ("items", items.as_str())]);
        if let Some(count) = rotation {
            let count = hex(count);
            src.push_str(&render(ROTATE, &[("arr", array.as_str()), ("count", count.as_str())]));
        }

        let encoded = accessors
            .keys()
            .any(|e| *e != StringArrayEncoding::None);
        let (b64, utf8) = if encoded {
            let b64 = program.fresh_name("b64");
            let utf8 = program.fresh_name("utf8");
            src.push_str(&render(BASE64_DECODER, &[("b64", b64.as_str())]));
            src.push_str(&render(UTF8_DECODER, &[("utf8", utf8.as_str())]));
            (b64, utf8)
        } else {
            (String::new(), String::new())
        };

        for (encoding, acc) in accessors {
            let template = match encoding {
                StringArrayEncoding::None => PLAIN_ACCESSOR,
                StringArrayEncoding::Base64 => BASE64_ACCESSOR,
                StringArrayEncoding::Rc4 => RC4_ACCESSOR,
            };
            src.push_str(&render(
                template,
                &[("acc", acc.as_str()), ("arr", array.as_str()), ("b64", b64.as_str()), ("utf8", utf8.as_str())],
            ));
        }

        instantiate(program, "string array", &src, &[])
    }
}

impl Transform for StringArray {
    fn name(&self) -> &'static str {
        "StringArray"
    }

    fn apply(&self, program: &mut Program, rng: &mut StdRng) -> Result<bool> {
        let mut counter = Counter(0);
        walk_program(&mut counter, program);
        let eligible = counter.0;

        let count = (self.threshold * eligible as f64).round() as usize;
        if count == 0 {
            debug!(eligible, "no string literals selected");
            return Ok(false);
        }

        let mut order: Vec<usize> = (0..eligible).collect();
        order.shuffle(rng);
        let selected: HashSet<usize> = order.into_iter().take(count).collect();

        let mut body = std::mem::take(&mut program.body);
        let mut extractor = Extractor {
            program: &mut *program,
            rng: &mut *rng,
            encodings: &self.encodings,
            selected: &selected,
            seen: 0,
            pool: StringLiteralPool::default(),
            accessors: IndexMap::new(),
        };
        extractor.visit_stmts(&mut body);
        let Extractor {
            pool, accessors, ..
        } = extractor;
        program.body = body;

        debug!(
            eligible,
            selected = count,
            entries = pool.len(),
            encodings = ?pool.encodings(),
            "built string array"
        );

        let preamble = self.preamble(program, rng, &pool, &accessors)?;
        let at = program.prologue_len();
        program.body.splice(at..at, preamble);
        Ok(true)
    }
}

fn eligible(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Lit(Lit::Str(value)) if !value.is_empty() => Some(value),
        _ => None,
    }
}

struct Counter(usize);

impl Visit for Counter {
    fn visit_expr(&mut self, expr: &Expr) {
        if eligible(expr).is_some() {
            self.0 += 1;
            return;
        }
        walk_expr(self, expr);
    }
}

struct Extractor<'a> {
    program: &'a mut Program,
    rng: &'a mut StdRng,
    encodings: &'a [StringArrayEncoding],
    selected: &'a HashSet<usize>,
    seen: usize,
    pool: StringLiteralPool,
    accessors: IndexMap<StringArrayEncoding, String>,
}

impl Extractor<'_> {
    fn accessor(&mut self, encoding: StringArrayEncoding) -> String {
        if let Some(name) = self.accessors.get(&encoding) {
            return name.clone();
        }
        let name = self.program.fresh_name("str");
        self.accessors.insert(encoding, name.clone());
        name
    }

    fn call_site(&mut self, value: &str) -> Expr {
        let entry = match self.pool.get(value) {
            Some(entry) => entry.clone(),
            None => {
                let encoding = self
                    .encodings
                    .choose(&mut *self.rng)
                    .copied()
                    .unwrap_or(StringArrayEncoding::None);
                let key = (encoding == StringArrayEncoding::Rc4).then(|| {
                    (0..KEY_LENGTH)
                        .map(|_| KEY_ALPHABET[self.rng.random_range(0..KEY_ALPHABET.len())] as char)
                        .collect::<String>()
                });
                self.pool.intern(value, encoding, key).clone()
            }
        };

        let acc = self.accessor(entry.encoding);
        let mut args = vec![Expr::num(hex(entry.index))];
        if let Some(key) = entry.key {
            args.push(Expr::str(key));
        }
        Expr::call(Expr::Ident(self.program.ident(acc)), args)
    }
}

impl VisitMut for Extractor<'_> {
    fn visit_expr(&mut self, expr: &mut Expr) {
        let Some(value) = eligible(expr).map(str::to_string) else {
            walk_expr_mut(self, expr);
            return;
        };
        let position = self.seen;
        self.seen += 1;
        if self.selected.contains(&position) {
            *expr = self.call_site(&value);
        }
    }
}
