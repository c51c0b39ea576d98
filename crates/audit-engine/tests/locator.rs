use pretty_assertions::assert_eq;
use soul_a11y_dom::{Document, FlatTree, NodeId, SelectorList};
use soul_a11y_engine::{get_selector, Locator, LocatorOptions, RunContext};

fn parse(html: &str) -> Document {
    Document::parse_html(html).expect("fixture parses")
}

fn first(doc: &Document, scope: NodeId, selector: &str) -> NodeId {
    doc.query_all(scope, &SelectorList::parse(selector).unwrap())[0]
}

const SHADOW_FIXTURE: &str = r#"<!doctype html>
<html><body>
  <div id="fixture"><div><template shadowrootmode="open"><div class="parent"><div><input id="myinput"></div></div></template></div></div>
</body></html>"#;

fn shadow_input(doc: &Document) -> NodeId {
    let host = first(doc, doc.root(), "#fixture > div");
    let shadow = doc.shadow_root(host).expect("declarative shadow root");
    first(doc, shadow, "#myinput")
}

#[test]
fn shadow_locator_has_one_segment_per_root() {
    let doc = parse(SHADOW_FIXTURE);
    let tree = FlatTree::build(&doc).unwrap();
    let run = RunContext::new(&tree);

    let locator = get_selector(&run, shadow_input(&doc), &LocatorOptions::default());
    assert_eq!(
        locator,
        Locator::Shadow(vec!["#fixture > div".into(), "#myinput".into()])
    );
    assert_eq!(locator.to_string(), "#fixture > div >>> #myinput");
}

#[test]
fn to_root_builds_full_paths_inside_each_root() {
    let doc = parse(SHADOW_FIXTURE);
    let tree = FlatTree::build(&doc).unwrap();
    let run = RunContext::new(&tree);

    let options = LocatorOptions {
        to_root: true,
        ..LocatorOptions::default()
    };
    let locator = get_selector(&run, shadow_input(&doc), &options);
    assert_eq!(
        locator.segments(),
        vec!["html > body > #fixture > div", ".parent > div > #myinput"]
    );
}

#[test]
fn unique_id_wins_over_other_features() {
    let doc = parse(
        r#"<html><body><div id="target" class="rare" role="note"></div><div></div></body></html>"#,
    );
    let tree = FlatTree::build(&doc).unwrap();
    let run = RunContext::new(&tree);

    let target = first(&doc, doc.root(), "#target");
    assert_eq!(
        get_selector(&run, target, &LocatorOptions::default()),
        Locator::Single("#target".into())
    );
}

#[test]
fn duplicated_or_volatile_ids_are_not_used() {
    let doc = parse(
        r#"<html><body>
          <p id="dup" class="first"></p><p id="dup"></p><p></p>
          <span id="player_uid_1234" class="video"></span><span></span>
        </body></html>"#,
    );
    let tree = FlatTree::build(&doc).unwrap();
    let run = RunContext::new(&tree);

    let dup = first(&doc, doc.root(), "p.first");
    assert_eq!(
        get_selector(&run, dup, &LocatorOptions::default()),
        Locator::Single(".first".into())
    );
    let player = first(&doc, doc.root(), "span.video");
    assert_eq!(
        get_selector(&run, player, &LocatorOptions::default()),
        Locator::Single(".video".into())
    );
}

#[test]
fn uncommon_classes_and_attributes_refine_the_tag() {
    let doc = parse(
        r#"<html><body>
          <div class="dogs cats"></div>
          <div role="menuitem"></div>
          <div></div>
          <div class="a b c"></div>
          <div></div>
        </body></html>"#,
    );
    let tree = FlatTree::build(&doc).unwrap();
    let run = RunContext::new(&tree);
    let options = LocatorOptions::default();

    let pets = first(&doc, doc.root(), ".dogs");
    assert_eq!(get_selector(&run, pets, &options), Locator::Single(".dogs.cats".into()));

    let menu = first(&doc, doc.root(), "[role]");
    assert_eq!(
        get_selector(&run, menu, &options),
        Locator::Single(r#"div[role="menuitem"]"#.into())
    );

    // three uncommon classes fall back to the tag name
    let many = first(&doc, doc.root(), ".a");
    let locator = get_selector(&run, many, &options);
    assert!(locator.to_string().starts_with("div:nth-child("), "{locator}");
}

#[test]
fn file_names_refine_links_and_images() {
    let doc = parse(
        r#"<html><body>
          <a href="/home">Home</a><a href="//deque.com/about/">About</a>
          <img src="/img/logo.png"><img src="/img/photo.jpg">
        </body></html>"#,
    );
    let tree = FlatTree::build(&doc).unwrap();
    let run = RunContext::new(&tree);
    let options = LocatorOptions::default();

    let about = first(&doc, doc.root(), r#"a[href$="about/"]"#);
    assert_eq!(
        get_selector(&run, about, &options),
        Locator::Single(r#"a[href$="about/"]"#.into())
    );
    let logo = first(&doc, doc.root(), r#"img[src$="logo.png"]"#);
    assert_eq!(
        get_selector(&run, logo, &options),
        Locator::Single(r#"img[src$="logo.png"]"#.into())
    );
}

#[test]
fn nth_child_only_when_a_sibling_shares_the_segment() {
    let doc = parse(
        r#"<html><body><ul><li>one</li><li>two</li></ul><ol><li class="solo">three</li></ol></body></html>"#,
    );
    let tree = FlatTree::build(&doc).unwrap();
    let run = RunContext::new(&tree);
    let options = LocatorOptions::default();

    let second = doc.query_all(doc.root(), &SelectorList::parse("ul > li").unwrap())[1];
    assert_eq!(get_selector(&run, second, &options), Locator::Single("li:nth-child(2)".into()));

    let solo = first(&doc, doc.root(), ".solo");
    assert_eq!(get_selector(&run, solo, &options), Locator::Single(".solo".into()));
}

#[test]
fn min_depth_keeps_ancestors_of_unique_elements() {
    let doc = parse(r#"<html><body><main><p id="lead">Hi</p></main></body></html>"#);
    let tree = FlatTree::build(&doc).unwrap();
    let run = RunContext::new(&tree);

    let lead = first(&doc, doc.root(), "#lead");
    let options = LocatorOptions {
        min_depth: 1,
        ..LocatorOptions::default()
    };
    assert_eq!(get_selector(&run, lead, &options), Locator::Single("main > #lead".into()));
}

#[test]
fn every_element_gets_a_locator_matching_only_itself() {
    let doc = parse(
        r#"<!doctype html>
<html lang="en"><head><title>Shop</title></head><body>
  <header class="top"><nav><a href="/">Home</a><a href="/cart.html">Cart</a><a href="/help">Help</a></nav></header>
  <main>
    <section><h2>Deals</h2><ul><li><img src="/a.png" alt="a"></li><li><img src="/b.png"></li><li><img src="/b.png"></li></ul></section>
    <section><h2>News</h2><p>One</p><p>Two</p><p class="note">Three</p></section>
    <form><input type="text" name="q"><input type="text" name="q"><button>Go</button></form>
  </main>
  <footer><p>Footer</p></footer>
</body></html>"#,
    );
    let tree = FlatTree::build(&doc).unwrap();
    let run = RunContext::new(&tree);

    for vnode in tree.iter() {
        let element = tree.node_of(vnode);
        let locator = get_selector(&run, element, &LocatorOptions::default());
        let Locator::Single(selector) = &locator else {
            panic!("light element got a shadow locator: {locator}");
        };
        let hits = doc.query_all(doc.root(), &SelectorList::parse(selector).unwrap());
        assert_eq!(hits, vec![element], "locator {selector}");

        assert_eq!(get_selector(&run, element, &LocatorOptions::default()), locator);
    }
}

#[test]
fn statistics_are_collected_once_per_run() {
    let doc = parse(r#"<html><body><p class="x"></p><p></p></body></html>"#);
    let tree = FlatTree::build(&doc).unwrap();

    let run = RunContext::new(&tree);
    assert!(!run.has_statistics());
    let paragraph = first(&doc, doc.root(), ".x");
    get_selector(&run, paragraph, &LocatorOptions::default());
    assert!(run.has_statistics());
    assert_eq!(run.statistics().tag_count("p"), 2);
    assert_eq!(run.statistics().class_count("x"), 1);

    let next = RunContext::new(&tree);
    assert!(!next.has_statistics());
}

#[test]
fn repeated_parses_give_identical_locators_and_snippets() {
    let source = r#"<html><body><div role="note" aria-label="x" title="t"></div><div></div></body></html>"#;
    for _ in 0..10 {
        let doc = parse(source);
        let tree = FlatTree::build(&doc).unwrap();
        let run = RunContext::new(&tree);
        let note = first(&doc, doc.root(), "[role]");

        assert_eq!(
            get_selector(&run, note, &LocatorOptions::default()),
            Locator::Single(r#"div[role="note"][aria-label="x"][title="t"]"#.into())
        );
        assert_eq!(
            doc.source_snippet(note, 300),
            r#"<div role="note" aria-label="x" title="t"></div>"#
        );
    }
}

#[test]
fn document_element_falls_back_to_root_pseudo_class() {
    let mut doc = Document::new();
    let html = doc.create_element("html");
    let body = doc.create_element("body");
    let nested = doc.create_element("html");
    doc.append_child(doc.root(), html).unwrap();
    doc.append_child(html, body).unwrap();
    doc.append_child(body, nested).unwrap();

    let tree = FlatTree::build(&doc).unwrap();
    let run = RunContext::new(&tree);

    let locator = get_selector(&run, html, &LocatorOptions::default());
    assert_eq!(locator, Locator::Single("html:root".into()));
    let hits = doc.query_all(doc.root(), &SelectorList::parse("html:root").unwrap());
    assert_eq!(hits, vec![html]);
}
