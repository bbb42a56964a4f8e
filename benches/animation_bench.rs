//! Animation benchmarks
//!
//! Measure the per-frame hot paths: keyframe lookup and interpolation,
//! skeletal state application, and software vertex blending.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use glam::{Quat, Vec3};
use tessera::animation::{AnimationSettings, InterpolationMode, VertexAnimationType, VertexBuffer, VertexData};
use tessera::scene::{Entity, Mesh, Skeleton};

/// A chain of `bones` bones with one animation rotating every bone.
fn build_skeleton(bones: u16, keys: usize) -> Skeleton {
    let mut skeleton = Skeleton::new("chain");
    let mut parent = None;
    for i in 0..bones {
        let bone = skeleton.create_bone(format!("bone{i}")).expect("bone");
        if let Some(parent) = parent {
            skeleton.set_parent(bone, parent).expect("parent");
            skeleton.bone_mut(bone).expect("bone").transform.position = Vec3::Y;
        }
        parent = Some(bone);
    }
    skeleton.set_binding_pose();

    let animation = skeleton.create_animation("sway", keys as f32).expect("animation");
    for bone in 0..bones {
        let track = animation.create_node_track(bone).expect("track");
        for k in 0..keys {
            let angle = (k as f32 * 0.3 + f32::from(bone) * 0.1).sin();
            track
                .create_node_key_frame(k as f32)
                .set_rotation(Quat::from_rotation_z(angle))
                .set_translate(Vec3::new(0.0, angle * 0.1, 0.0));
        }
    }
    skeleton
}

fn morph_mesh(vertices: usize) -> Arc<Mesh> {
    let rest: Vec<Vec3> = (0..vertices).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect();
    let bent: Vec<Vec3> = rest.iter().map(|p| *p + Vec3::Y).collect();

    let mut mesh = Mesh::new("sheet");
    mesh.set_shared_vertex_data(Some(VertexData::with_positions(&rest)));
    let track = mesh
        .create_animation("bend", 1.0)
        .expect("animation")
        .create_vertex_track(0, VertexAnimationType::Morph)
        .expect("track");
    track
        .create_vertex_morph_key_frame(0.0, VertexBuffer::from_positions(&rest))
        .expect("key");
    track
        .create_vertex_morph_key_frame(1.0, VertexBuffer::from_positions(&bent))
        .expect("key");
    Arc::new(mesh)
}

fn bench_node_interpolation(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_track/interpolate");

    for mode in [InterpolationMode::Linear, InterpolationMode::Spline] {
        let settings = AnimationSettings {
            interpolation_mode: mode,
            ..Default::default()
        };
        let mut animation = settings.create_animation("sweep", 100.0);
        let track = animation.create_node_track(0).expect("track");
        for k in 0..100 {
            track
                .create_node_key_frame(k as f32)
                .set_translate(Vec3::splat((k as f32).sin()));
        }
        let params = animation.params();
        let track = animation.node_track(0).expect("track");

        group.bench_function(BenchmarkId::from_parameter(format!("{mode:?}")), |b| {
            let mut time = 0.0_f32;
            b.iter(|| {
                time = (time + 0.37) % 100.0;
                black_box(track.interpolated_key_frame(&params, black_box(time)))
            });
        });
    }
    group.finish();
}

fn bench_skeleton_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("entity/skeletal_update");

    for bones in [16_u16, 64, 200] {
        let mut mesh = Mesh::new("rig");
        mesh.set_skeleton(Some(build_skeleton(bones, 30)));
        let mut entity = Entity::new("rig", Arc::new(mesh)).expect("entity");
        entity.animation_state_mut("sway").expect("state").set_enabled(true);

        group.bench_with_input(BenchmarkId::from_parameter(bones), &bones, |b, _| {
            b.iter(|| {
                entity.animation_state_mut("sway").expect("state").add_time(0.016);
                black_box(entity.update_animation(false).expect("update"))
            });
        });
    }
    group.finish();
}

fn bench_software_morph(c: &mut Criterion) {
    let mut group = c.benchmark_group("entity/software_morph");

    for vertices in [1_000_usize, 10_000, 100_000] {
        let mut entity = Entity::new("sheet", morph_mesh(vertices)).expect("entity");
        entity.animation_state_mut("bend").expect("state").set_enabled(true);

        group.bench_with_input(BenchmarkId::from_parameter(vertices), &vertices, |b, _| {
            b.iter(|| {
                entity.animation_state_mut("bend").expect("state").add_time(0.016);
                black_box(entity.update_animation(false).expect("update"))
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_node_interpolation,
    bench_skeleton_update,
    bench_software_morph
);
criterion_main!(benches);
