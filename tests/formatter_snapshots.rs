//! Snapshot tests for formatted output

use std::sync::Arc;
use vimscan::highlighting::{
    HtmlFormatter, ItemOptions, Pattern, PlainFormatter, Region, Scanner, SyntaxDefinition,
    SyntaxDefinitionBuilder,
};

fn pattern(src: &str) -> Pattern {
    Pattern::new(src).unwrap()
}

fn c_like() -> Arc<SyntaxDefinition> {
    let mut b = SyntaxDefinitionBuilder::new("c");
    b.add_keywords("Statement", ["if", "else", "return"], ItemOptions::default());
    b.add_keywords("Type", ["int"], ItemOptions::default());
    b.add_match("Number", pattern(r"\d+"), ItemOptions::default());
    b.add_region(
        "String",
        Region::new().start(pattern("\"")).end(pattern("\"")),
        ItemOptions::default(),
    );
    b.add_region(
        "Comment",
        Region::new().start(pattern(r"/\*")).end(pattern(r"\*/")),
        ItemOptions::default().contains("Todo"),
    );
    b.add_match("Todo", pattern("TODO"), ItemOptions::default().contained());
    Arc::new(b.finish().unwrap())
}

fn to_html(definition: Arc<SyntaxDefinition>, input: &str) -> String {
    let id = definition.id().to_string();
    let mut formatter = HtmlFormatter::new(Vec::new()).with_syntax_id(id);
    Scanner::new(definition)
        .scan_str(input, &mut formatter)
        .unwrap();
    String::from_utf8(formatter.into_inner()).unwrap()
}

#[test]
fn test_c_snippet_html() {
    let html = to_html(c_like(), "int n = 42; /* TODO: x */\nif n return \"a<b\";\n");
    insta::assert_snapshot!(html.trim_end(), @r###"
<pre class="vimscan c"><span class="type">int</span> n = <span class="number">42</span>; <span class="comment">/* </span><span class="todo">TODO</span><span class="comment">: x */</span>
<span class="statement">if</span> n <span class="statement">return</span> <span class="string">&quot;a&lt;b&quot;</span>;
</pre>
"###);
}

#[test]
fn test_matchgroup_html() {
    let mut b = SyntaxDefinitionBuilder::new("t");
    b.add_region(
        "String",
        Region::new()
            .start(pattern("<<").with_matchgroup("Delimiter"))
            .end(pattern(">>").with_matchgroup("Delimiter")),
        ItemOptions::default(),
    );
    let html = to_html(Arc::new(b.finish().unwrap()), "a <<b>> c");
    insta::assert_snapshot!(html.trim_end(), @r###"<pre class="vimscan t">a <span class="delimiter">&lt;&lt;</span><span class="string">b</span><span class="delimiter">&gt;&gt;</span> c</pre>"###);
}

#[test]
fn test_plain_drops_highlighting() {
    let mut formatter = PlainFormatter::new(Vec::new());
    Scanner::new(c_like())
        .scan_str("int x;\r\nreturn x;", &mut formatter)
        .unwrap();
    let text = String::from_utf8(formatter.into_inner()).unwrap();
    insta::assert_snapshot!(text, @r###"
int x;
return x;
"###);
}
