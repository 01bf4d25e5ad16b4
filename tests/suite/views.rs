//! Object tree and reference views fed with realistic payloads.

use std::fs;

use dmlc_types::ObjectTreeType;
use dmlc_views::{NavLink, ObjectTreeState, ReferenceBrowser};

fn object_tree_notification() -> serde_json::Value {
    serde_json::json!({
        "root": {
            "name": "",
            "kind": 5,
            "location": null,
            "vars": [],
            "procs": [],
            "children": [
                { "name": "/datum", "kind": 5, "vars": [], "procs": [], "children": [] },
                {
                    "name": "/mob",
                    "kind": 5,
                    "vars": [{ "name": "ckey", "kind": 13, "is_declaration": true }],
                    "procs": [{ "name": "Login", "kind": 6, "is_verb": false }],
                    "children": [
                        { "name": "/mob/living", "kind": 5, "vars": [], "procs": [], "children": [] },
                        { "name": "/mob/dead", "kind": 5, "vars": [], "procs": [], "children": [] }
                    ]
                }
            ]
        }
    })
}

#[test]
fn object_tree_follows_navigation_links() {
    let payload = object_tree_notification();
    let root: ObjectTreeType = serde_json::from_value(payload["root"].clone()).unwrap();
    assert_eq!(root.type_count(), 5);

    let mut state = ObjectTreeState::new();
    let collapsed = state.render(Some(&root), true);
    assert_eq!(
        collapsed,
        "<ul><li>/datum</li><li>/mob [<a href='expand:/mob'>+2</a>]</li></ul>"
    );

    assert!(state.navigate(&NavLink::parse("expand:/mob")));
    let expanded = state.render(Some(&root), true);
    assert!(expanded.contains("[<a href='contract:/mob'>-2</a>]"));
    assert!(expanded.contains("<ul><li>/mob/living</li><li>/mob/dead</li></ul>"));

    assert!(state.navigate(&NavLink::parse("contract:/mob")));
    assert_eq!(state.render(Some(&root), true), collapsed);
}

#[test]
fn reference_pages_link_back_into_the_reference() {
    let install = tempfile::tempdir().unwrap();
    let refdir = install.path().join("help").join("ref");
    fs::create_dir_all(&refdir).unwrap();
    fs::write(
        refdir.join("info.html"),
        "<html><body>\n\
         <a name=/proc/sleep>\n\
         <h2>sleep proc</h2>\n\
         <dl><dt>Format:</dt><dd><xmp>sleep(Delay)\nreturn</xmp></dd></dl>\n\
         See also: <a href=#/proc/spawn>spawn</a>\n\
         <hr>\n\
         <a name=/proc/spawn>\n\
         <h2>spawn proc</h2>\n\
         <hr>\n\
         </body></html>",
    )
    .unwrap();
    fs::write(
        refdir.join("contents.html"),
        "<html><body><dl><dt><a href=info.html#/proc/sleep>sleep</a></dt></dl></body></html>",
    )
    .unwrap();
    let browser = ReferenceBrowser::new(vec![install.path().to_path_buf()]);

    let sleep = browser.open(Some("/proc/sleep")).unwrap();
    assert!(sleep.contains("<b><tt>/proc/sleep</tt></b>"));
    assert!(sleep.contains("<ul><li>Format:</li><li>sleep(Delay)<br>return</li></ul>"));
    assert!(sleep.contains("<a href=\"#/proc/spawn\">spawn</a>"));

    let link = NavLink::parse("#/proc/spawn");
    let spawn = browser.navigate(&link).unwrap().unwrap();
    assert!(spawn.contains("spawn proc"));
    assert!(!spawn.contains("sleep proc"));

    let index = browser.navigate(&NavLink::parse("command:dreammaker.openReference"));
    let index = index.unwrap().unwrap();
    assert!(index.contains("<a href=\"info.html#/proc/sleep\">sleep</a>"));
}
