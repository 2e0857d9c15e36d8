// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs;

use logroute::Dispatcher;
use logroute::record::Level;
use logroute::sink::XmlFileBuilder;
use tempfile::TempDir;

fn assert_well_framed(content: &str, records: usize) {
    assert!(content.starts_with("<log created=\""), "{content}");
    assert!(content.ends_with("</log>\n"), "{content}");
    assert_eq!(content.matches("<log ").count(), 1);
    assert_eq!(content.matches("\t<record level=").count(), records);
    assert_eq!(content.matches("\t</record>\n").count(), records);
}

#[test]
fn test_records_share_one_root() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("app.xml");
    let xml = XmlFileBuilder::new(&path).build().unwrap();

    let mut dispatcher = Dispatcher::new();
    dispatcher.add_sink("xml", Level::Debug, xml).unwrap();
    for i in 0..7 {
        dispatcher.info(format_args!("record {i}"));
    }
    dispatcher.fine("below threshold");
    dispatcher.close();

    let content = fs::read_to_string(&path).unwrap();
    assert_well_framed(&content, 7);
    assert!(content.contains("<message>record 6</message>"));
    assert!(!content.contains("below threshold"));
}

#[test]
fn test_every_rotated_document_is_closed() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("rotated.xml");
    let xml = XmlFileBuilder::new(&path)
        .archive(true)
        .max_records(4)
        .build()
        .unwrap();

    let mut dispatcher = Dispatcher::new();
    dispatcher.add_sink("xml", Level::Finest, xml).unwrap();
    for i in 0..10 {
        dispatcher.log(Level::Warning, "worker", format!("job {i} done"));
    }
    drop(dispatcher);

    let backup = |n: u16| temp_dir.path().join(format!("rotated.xml.{n:03}"));
    assert_well_framed(&fs::read_to_string(backup(1)).unwrap(), 4);
    assert_well_framed(&fs::read_to_string(backup(2)).unwrap(), 4);
    let current = fs::read_to_string(&path).unwrap();
    assert_well_framed(&current, 2);
    assert!(current.contains("<record level=\"WARN\">"));
    assert!(current.contains("<source>worker</source>"));
    assert!(!backup(3).exists());
}
