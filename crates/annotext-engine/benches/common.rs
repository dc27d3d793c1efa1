// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
#[allow(dead_code)]
pub fn generate_latex_content(size: usize) -> String {
    let base = "\\section{Results}\nWe show that $f(x) = x^2$ holds, see \\cite[p.~2]{knuth}.\n\
        \\begin{equation}\n  a + b = c,\n\\end{equation}\n\
        where \\emph{everything} is ``fine''.\\footnote{Not really.}\n\n";
    base.repeat(size)
}

#[allow(dead_code)]
pub fn generate_markdown_content(size: usize) -> String {
    let base = "# Title\n\n## Section\n\nParagraph with *some* content and `code`.\n\n\
        - Bullet point\n  - Nested item\n- Another item\n\n\
        ```rust\nfn example() {\n    println!(\"Hello\");\n}\n```\n\n";
    base.repeat(size)
}

#[allow(dead_code)]
pub fn generate_rst_content(size: usize) -> String {
    let base = "Section\n=======\n\nSome *emphasis* and ``literal`` text.\n\n\
        * item\n* item\n\n.. note::\n\n   Indented.\n\n";
    base.repeat(size)
}

#[allow(dead_code)]
pub fn generate_html_content(size: usize) -> String {
    let base = "<h2>Section</h2>\n<p>Some <em>emphasis</em> &amp; a\n<a href=\"#x\">link</a>.</p>\n\
        <ul><li>One</li><li>Two</li></ul>\n<script>var x = 1;</script>\n";
    base.repeat(size)
}

#[allow(dead_code)]
pub fn generate_rust_content(size: usize) -> String {
    let base = "/// Adds *two* numbers.\n/// Returns `sum`.\nfn add(a: u8) -> u8 {\n    a + 2 // plus two\n}\n\n\
        /*\n * Block\n * comment.\n */\nconst URL: &str = \"https://example.com\";\n\n";
    base.repeat(size)
}
