//! Generate a session report for a small checkout recording

fn main() {
    let json = r#"[
        { "type": 4, "timestamp": 1700000000000, "data": { "href": "https://shop.example/cart", "width": 1280, "height": 800 } },
        { "type": 2, "timestamp": 1700000000010, "data": { "node": { "type": 0, "id": 1, "childNodes": [
            { "type": 2, "id": 2, "tagName": "html", "childNodes": [
                { "type": 2, "id": 3, "tagName": "body", "childNodes": [
                    { "type": 2, "id": 10, "tagName": "label", "attributes": { "for": "coupon" },
                      "childNodes": [{ "type": 3, "id": 11, "textContent": "Coupon code" }] },
                    { "type": 2, "id": 12, "tagName": "input", "attributes": { "id": "coupon", "type": "text" } },
                    { "type": 2, "id": 1001, "tagName": "button", "attributes": { "id": "submit" },
                      "childNodes": [{ "type": 3, "id": 1002, "textContent": "Buy" }] }
                ]}
            ]}
        ]}}},
        { "type": 3, "timestamp": 1700000002000, "data": { "source": 5, "id": 12, "text": "SAVE10" } },
        { "type": 3, "timestamp": 1700000009000, "data": { "source": 2, "type": 2, "id": 1001, "x": 640, "y": 420 } },
        { "type": 3, "timestamp": 1700000009200, "data": { "source": 2, "type": 2, "id": 1001, "x": 641, "y": 421 } },
        { "type": 3, "timestamp": 1700000009350, "data": { "source": 2, "type": 2, "id": 1001, "x": 641, "y": 421 } },
        { "type": 5, "timestamp": 1700000015000, "data": { "tag": "pagehide" } }
    ]"#;

    match session_lens::events_to_report(json) {
        Ok(report) => print!("{report}"),
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
