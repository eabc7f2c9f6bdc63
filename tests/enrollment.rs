use academia::{FileRegistry, RegistryEngine, RegistryError, StoreConfig};
use crossbeam_utils::thread;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tempfile::{tempdir, TempDir};

fn open() -> (FileRegistry, TempDir) {
    let dir = tempdir().unwrap();
    let registry = FileRegistry::open(StoreConfig::new(dir.path())).unwrap();
    (registry, dir)
}

fn add_students(registry: &FileRegistry, count: usize) -> Vec<String> {
    (0..count)
        .map(|n| {
            let id = format!("s{}", n);
            registry.add_student(&id, "Student", "pw").unwrap();
            id
        })
        .collect()
}

/// every slot points at a course that lists the student, and every listed student holds a slot
fn assert_reciprocal(registry: &FileRegistry) {
    let students = registry.list_students().unwrap();
    let courses = registry.list_courses().unwrap();

    for student in &students {
        let mut seen: Vec<&str> = Vec::new();
        for course_id in student.courses.values() {
            assert!(!seen.contains(&course_id), "{} holds {} twice", student.id, course_id);
            seen.push(course_id);
            let course = courses
                .iter()
                .find(|c| c.id == course_id)
                .unwrap_or_else(|| panic!("{} holds unknown course {}", student.id, course_id));
            assert!(
                course.students.contains(&student.id),
                "{} holds {} but is not listed",
                student.id,
                course_id
            );
        }
    }

    for course in &courses {
        assert!(course.enrolled_count() <= course.total_seats);
        let mut seen: Vec<&str> = Vec::new();
        for student_id in course.students.iter() {
            assert!(!seen.contains(&student_id), "{} lists {} twice", course.id, student_id);
            seen.push(student_id);
            let student = students
                .iter()
                .find(|s| s.id == student_id)
                .unwrap_or_else(|| panic!("{} lists unknown student {}", course.id, student_id));
            assert!(student.courses.contains(&course.id));
        }
    }
}

#[test]
fn enroll_then_repeat_then_block() {
    let (registry, _dir) = open();
    registry.seed_defaults().unwrap();
    registry.add_course("f1", "c1", "Algebra", 5).unwrap();
    registry.add_course("f1", "c2", "Geometry", 5).unwrap();

    registry.enroll("s1", "c1").unwrap();
    let course = registry.courses().find_by_id("c1").unwrap();
    assert_eq!(course.enrolled_count(), 1);
    assert_eq!(registry.list_student_enrollments("s1").unwrap(), vec!["c1"]);

    assert!(matches!(
        registry.enroll("s1", "c1"),
        Err(RegistryError::AlreadyEnrolled { .. })
    ));
    assert_eq!(registry.courses().find_by_id("c1").unwrap().enrolled_count(), 1);

    registry.block_student("s1").unwrap();
    assert!(matches!(
        registry.enroll("s1", "c2"),
        Err(RegistryError::Blocked(_))
    ));
    assert!(registry.list_course_enrollments("c2").unwrap().is_empty());

    registry.activate_student("s1").unwrap();
    registry.enroll("s1", "c2").unwrap();
    assert_reciprocal(&registry);
}

#[test]
fn full_course_leaves_records_unchanged() {
    let (registry, _dir) = open();
    let students = add_students(&registry, 3);
    registry.add_course("f1", "c1", "Small", 2).unwrap();

    registry.enroll(&students[0], "c1").unwrap();
    registry.enroll(&students[1], "c1").unwrap();
    let before = registry.students().find_by_id(&students[2]).unwrap();

    assert!(matches!(
        registry.enroll(&students[2], "c1"),
        Err(RegistryError::CourseFull(_))
    ));
    assert_eq!(registry.students().find_by_id(&students[2]).unwrap(), before);
    assert_eq!(
        registry.list_course_enrollments("c1").unwrap(),
        vec!["s0", "s1"]
    );
}

#[test]
fn unknown_course_is_reported_as_course_not_found() {
    let (registry, _dir) = open();
    add_students(&registry, 1);
    assert!(matches!(
        registry.enroll("s0", "nope"),
        Err(RegistryError::CourseNotFound(_))
    ));
    assert!(matches!(
        registry.enroll("ghost", "nope"),
        Err(RegistryError::NotFound { .. })
    ));
}

#[test]
fn unenroll_frees_the_seat() {
    let (registry, _dir) = open();
    let students = add_students(&registry, 2);
    registry.add_course("f1", "c1", "Tiny", 1).unwrap();

    registry.enroll(&students[0], "c1").unwrap();
    registry.unenroll(&students[0], "c1").unwrap();
    assert!(matches!(
        registry.unenroll(&students[0], "c1"),
        Err(RegistryError::NotEnrolled { .. })
    ));
    registry.enroll(&students[1], "c1").unwrap();
    assert_reciprocal(&registry);
}

#[test]
fn removing_a_course_clears_student_slots() {
    let (registry, _dir) = open();
    registry.seed_defaults().unwrap();
    registry.add_course("f1", "c1", "Algebra", 5).unwrap();
    registry.add_course("f1", "c2", "Geometry", 5).unwrap();
    registry.enroll("s1", "c1").unwrap();
    registry.enroll("s1", "c2").unwrap();

    registry.remove_course("f1", "c1").unwrap();

    let ids: Vec<String> = registry
        .list_courses()
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec!["c2"]);
    assert_eq!(registry.list_student_enrollments("s1").unwrap(), vec!["c2"]);
    assert!(matches!(
        registry.remove_course("f1", "c1"),
        Err(RegistryError::NotFound { .. })
    ));
    assert_reciprocal(&registry);
}

#[test]
fn lowering_seats_drops_the_latest_enrollments() {
    let (registry, _dir) = open();
    let students = add_students(&registry, 4);
    registry.add_course("f1", "c1", "Big", 4).unwrap();
    for id in &students {
        registry.enroll(id, "c1").unwrap();
    }

    let course = registry.update_course("f1", "c1", "Smaller", 2).unwrap();
    assert_eq!(course.enrolled_count(), 2);
    assert_eq!(
        registry.list_course_enrollments("c1").unwrap(),
        vec!["s0", "s1"]
    );
    assert!(registry.list_student_enrollments("s3").unwrap().is_empty());
    assert_reciprocal(&registry);
}

#[test]
fn concurrent_enrollments_fill_the_course_exactly() {
    const SEATS: usize = 8;
    let (registry, _dir) = open();
    let students = add_students(&registry, SEATS);
    registry.add_course("f1", "c1", "Popular", SEATS as u32).unwrap();

    thread::scope(|s| {
        for id in &students {
            let registry = registry.clone();
            s.spawn(move |_| registry.enroll(id, "c1").unwrap());
        }
    })
    .unwrap();

    let mut enrolled = registry.list_course_enrollments("c1").unwrap();
    enrolled.sort();
    let mut expected = students.clone();
    expected.sort();
    assert_eq!(enrolled, expected);
    assert_reciprocal(&registry);
}

#[test]
fn concurrent_enrollments_never_oversubscribe() {
    const SEATS: usize = 5;
    let (registry, _dir) = open();
    let students = add_students(&registry, SEATS * 2);
    registry.add_course("f1", "c1", "Scarce", SEATS as u32).unwrap();

    let results: Vec<bool> = thread::scope(|s| {
        let handles: Vec<_> = students
            .iter()
            .map(|id| {
                let registry = registry.clone();
                s.spawn(move |_| match registry.enroll(id, "c1") {
                    Ok(()) => true,
                    Err(RegistryError::CourseFull(_)) => false,
                    Err(e) => panic!("unexpected error: {}", e),
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
    .unwrap();

    assert_eq!(results.iter().filter(|ok| **ok).count(), SEATS);
    assert_eq!(registry.list_course_enrollments("c1").unwrap().len(), SEATS);
    assert_reciprocal(&registry);
}

#[test]
fn random_enroll_and_unenroll_keep_both_sides_reciprocal() {
    let (registry, _dir) = open();
    let students = add_students(&registry, 6);
    let courses = ["c1", "c2", "c3"];
    for id in &courses {
        registry.add_course("f1", id, "Course", 3).unwrap();
    }

    thread::scope(|s| {
        for seed in 0..4u64 {
            let registry = registry.clone();
            let students = &students;
            s.spawn(move |_| {
                let mut rng = SmallRng::seed_from_u64(seed);
                for _ in 0..40 {
                    let student = &students[rng.gen_range(0..students.len())];
                    let course = courses[rng.gen_range(0..courses.len())];
                    let result = if rng.gen_bool(0.6) {
                        registry.enroll(student, course)
                    } else {
                        registry.unenroll(student, course)
                    };
                    match result {
                        Ok(())
                        | Err(RegistryError::AlreadyEnrolled { .. })
                        | Err(RegistryError::NotEnrolled { .. })
                        | Err(RegistryError::CourseFull(_)) => {}
                        Err(e) => panic!("unexpected error: {}", e),
                    }
                }
            });
        }
    })
    .unwrap();

    assert_reciprocal(&registry);
}
