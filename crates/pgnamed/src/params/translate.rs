/// A query rewritten from `:name` placeholders to `$1, $2, ...` markers.
///
/// `names()` holds one entry per placeholder occurrence, so `names()[i]` is the argument
/// that feeds marker `$(i + 1)`. A name used twice appears twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranslatedQuery {
    sql: String,
    names: Vec<String>,
}

impl TranslatedQuery {
    /// The positional SQL (`$1, $2, ...`).
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameter names in marker order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of positional markers in [`TranslatedQuery::sql`].
    pub fn param_count(&self) -> usize {
        self.names.len()
    }

    /// Split into the positional SQL and the name list.
    pub fn into_parts(self) -> (String, Vec<String>) {
        (self.sql, self.names)
    }
}

fn is_word_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Rewrite `:name` placeholders into positional `$N` markers.
///
/// A colon starts a placeholder only when it is not preceded by `:`, a word character or `\`,
/// and the identifier after it is not followed by `:`. This leaves casts (`value::text`),
/// array slices (`arr[1:2]`) and escaped colons (`\:name`) untouched. A placeholder directly
/// followed by a cast (`:name::text`) is not recognized either; use `CAST(:name AS text)`.
/// The identifier is never shortened to find a match, so `:abc::int` stays as written instead
/// of becoming `$1c::int` with the name `ab`.
///
/// The rewrite is purely textual: colons inside string literals or comments are treated the
/// same as anywhere else. Translation never fails.
///
/// # Example
///
/// ```
/// use pgnamed::translate;
///
/// let q = translate("SELECT * FROM t WHERE id = :id AND tags::text[] && :tags");
/// assert_eq!(q.sql(), "SELECT * FROM t WHERE id = $1 AND tags::text[] && $2");
/// assert_eq!(q.names(), ["id", "tags"]);
/// ```
pub fn translate(raw_sql: &str) -> TranslatedQuery {
    let mut sql = String::with_capacity(raw_sql.len());
    let mut names = Vec::new();

    // End of the text already copied into `sql`.
    let mut copied = 0;
    let mut prev: Option<char> = None;
    let mut chars = raw_sql.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        let starts_placeholder = c == ':'
            && !matches!(prev, Some(p) if p == ':' || p == '\\' || is_word_char(p));
        if !starts_placeholder {
            prev = Some(c);
            continue;
        }

        let ident_start = pos + c.len_utf8();
        let mut ident_end = ident_start;
        let mut last = c;
        while let Some(&(i, next)) = chars.peek() {
            if !is_word_char(next) {
                break;
            }
            ident_end = i + next.len_utf8();
            last = next;
            chars.next();
        }
        prev = Some(last);

        if ident_end == ident_start {
            continue;
        }
        if matches!(chars.peek(), Some(&(_, ':'))) {
            continue;
        }

        sql.push_str(&raw_sql[copied..pos]);
        names.push(raw_sql[ident_start..ident_end].to_string());
        sql.push('$');
        sql.push_str(&names.len().to_string());
        copied = ident_end;
    }
    sql.push_str(&raw_sql[copied..]);

    #[cfg(feature = "tracing")]
    tracing::debug!(placeholders = names.len(), "translated named query");

    TranslatedQuery { sql, names }
}
