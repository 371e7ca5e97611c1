use std::hint::black_box;
use std::rc::Rc;

use criterion::{criterion_group, criterion_main, Criterion};
use globe_map::assets::OfflineLoader;
use globe_map::data::Outlines;
use globe_map::geo::{from_map_projection, to_map_projection, to_sphere_point};
use globe_map::globe::{GlobeRenderer, GlobeSettings};
use globe_map::map::{visible_tiles, MapView};
use globe_map::render::{Container, FrameScheduler, Surface};
use globe_map::style::ViewStyle;

fn projection(c: &mut Criterion) {
    let points: Vec<(f64, f64)> = (0..1000)
        .map(|i| {
            let t = i as f64 / 1000.0;
            (-80.0 + 160.0 * t, -180.0 + 360.0 * t)
        })
        .collect();

    c.bench_function("mercator_round_trip_1k", |b| {
        b.iter(|| {
            for &(lat, lon) in &points {
                let m = to_map_projection(black_box(lat), black_box(lon));
                black_box(from_map_projection(m.x, m.y));
            }
        })
    });

    c.bench_function("sphere_point_1k", |b| {
        b.iter(|| {
            for &(lat, lon) in &points {
                black_box(to_sphere_point(black_box(lat), black_box(lon), 5.0));
            }
        })
    });

    let view = MapView::centered_on(48.8566, 2.3522, 12.0, 240, 120);
    c.bench_function("visible_tiles_240x120", |b| {
        b.iter(|| black_box(visible_tiles(black_box(&view), 12)))
    });
}

fn globe_frame(c: &mut Criterion) {
    let mut globe = GlobeRenderer::new(
        Box::new(OfflineLoader::default()),
        Rc::new(Outlines::simple_world()),
        GlobeSettings::default(),
    );
    let mut scheduler = FrameScheduler::new();
    let container = Container::new(Surface::Globe, 160, 48);
    if let Err(e) = globe.initialize(&container, ViewStyle::Satellite, &mut scheduler) {
        panic!("globe init failed: {e}");
    }

    c.bench_function("globe_frame_160x48", |b| {
        b.iter(|| {
            let (frame, due) = scheduler.begin_frame(1.0 / 60.0);
            for (handle, _) in due {
                black_box(globe.on_frame(handle, &frame, &mut scheduler));
            }
        })
    });
}

criterion_group!(benches, projection, globe_frame);
criterion_main!(benches);
