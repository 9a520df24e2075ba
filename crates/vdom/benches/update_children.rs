use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use dom::Document;
use std::hint::black_box;
use std::rc::Rc;
use vdom::{NodeOps, PatchSource, Patcher, VNode, VNodeData};

const ROWS: usize = 1_000;

fn row(id: usize) -> VNode {
    let label = id.to_string();
    VNode::element(
        "tr",
        VNodeData::new().key(label.as_str()),
        vec![VNode::element("td", VNodeData::new(), vec![VNode::text(label.as_str())])],
    )
}

fn table(ids: impl Iterator<Item = usize>) -> VNode {
    VNode::element("tbody", VNodeData::new(), ids.map(row).collect())
}

/// A patcher with `old` already rendered into a fresh document.
fn mounted(old: &mut VNode) -> Patcher {
    let document = Rc::new(Document::new());
    let patcher = Patcher::new(Rc::clone(&document) as Rc<dyn NodeOps>);
    if let Ok(Some(elm)) = patcher.patch(None, Some(old)) {
        let _ignored = document.append_child(document.root(), elm);
    }
    patcher
}

fn bench_reorders(crit: &mut Criterion) {
    let cases: [(&str, Vec<usize>); 4] = [
        ("reverse", (0..ROWS).rev().collect()),
        ("swap_rows", {
            let mut ids: Vec<usize> = (0..ROWS).collect();
            ids.swap(1, ROWS - 2);
            ids
        }),
        ("prepend", (0..=ROWS).map(|id| (id + ROWS) % (ROWS + 1)).collect()),
        ("remove_every_tenth", (0..ROWS).filter(|id| id % 10 != 0).collect()),
    ];
    for (name, order) in cases {
        crit.bench_function(&format!("update_children_{name}"), |bencher| {
            bencher.iter_batched(
                || {
                    let mut old = table(0..ROWS);
                    let patcher = mounted(&mut old);
                    (patcher, old, table(order.iter().copied()))
                },
                |(patcher, old, mut new)| {
                    let result = patcher.patch(Some(PatchSource::VNode(&old)), Some(&mut new));
                    black_box(result.is_ok());
                },
                BatchSize::SmallInput,
            );
        });
    }
}

criterion_group!(benches, bench_reorders);
criterion_main!(benches);
