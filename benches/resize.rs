use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use jk_nodes::core::resample::{resize_batch, ResizeMethod};
use jk_nodes::core::tensor::ImageBatch;
use jk_nodes::filters::builtin::image::{center_crop, concatenate_images, Direction};

fn gradient(height: usize, width: usize) -> ImageBatch {
    ImageBatch::from_fn((1, height, width, 3), |(_, y, x, c)| {
        ((y * 7 + x * 13 + c * 29) % 256) as f32 / 255.0
    })
}

fn bench_resize(c: &mut Criterion) {
    let mut group = c.benchmark_group("resize");
    let cases = [(512usize, 512usize, 224usize, 224usize), (768, 1024, 1024, 1024)];

    for &(src_h, src_w, dst_h, dst_w) in &cases {
        let input = gradient(src_h, src_w);
        for method in ResizeMethod::ALL {
            let label = format!("{src_h}x{src_w}->{dst_h}x{dst_w}");
            group.bench_with_input(BenchmarkId::new(method.as_str(), label), &input, |b, batch| {
                b.iter(|| black_box(resize_batch(black_box(batch), dst_h, dst_w, method)))
            });
        }
    }
    group.finish();
}

fn bench_geometry(c: &mut Criterion) {
    let mut group = c.benchmark_group("geometry");
    let first = gradient(512, 512);
    let second = gradient(384, 256);

    group.bench_function("center_crop_16_9", |b| {
        b.iter(|| black_box(center_crop(black_box(&first), 16.0 / 9.0)))
    });

    let (a, b_elem) = match (first.element(0), second.element(0)) {
        (Some(a), Some(b)) => (a, b),
        _ => return,
    };
    group.bench_function("concatenate_right_matched", |b| {
        b.iter(|| {
            black_box(concatenate_images(a, b_elem, Direction::Right, ResizeMethod::Bilinear, true))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_resize, bench_geometry);
criterion_main!(benches);
