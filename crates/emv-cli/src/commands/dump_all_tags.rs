//! Dump all TLV tags found in a response, including unknown ones

use emv_common::tlv;

use crate::formatters::{self, FormatMode};

/// Parse and display all TLV tags in data, descending into templates
pub fn dump_all_tags(data: &[u8], indent: usize, mode: FormatMode) {
    let indent_str = " ".repeat(indent * 2);

    let objects = match tlv::decode(data) {
        Ok(objects) => objects,
        Err(err) => {
            println!("{}<malformed: {}> {}", indent_str, err, hex::encode_upper(data));
            return;
        }
    };

    for object in objects {
        let tag_name = emv_common::get_tag_name(object.tag);
        print!("{}[{}] {}", indent_str, hex::encode_upper(object.tag), tag_name);

        if object.is_constructed() {
            println!();
            dump_all_tags(object.value, indent + 1, mode);
            continue;
        }

        // Print value (formatted for short values, truncated for long)
        if object.length <= 32 {
            println!(": {}", formatters::format_value(object.tag, object.value, mode));
        } else {
            println!(
                ": {}... ({} bytes)",
                hex::encode_upper(&object.value[..32]),
                object.length
            );
        }
    }
}
