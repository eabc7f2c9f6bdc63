//! Fixed-width binary encoding of the entity records.
//!
//! Every record of a type has the same size, so record `n` of a file lives at byte offset
//! `n * R::SIZE`. Layouts (integers are little-endian `u32`, strings are NUL padded to
//! their capacity, which includes the terminator):
//!
//! ```text
//! User     id[10] role password[50]                                        =   64 bytes
//! Student  id[10] name[50] active slots[100][10]                           = 1064 bytes
//! Faculty  id[10] name[50]                                                 =   60 bytes
//! Course   id[10] name[50] faculty_id[10] seats enrolled students[100][10] = 1078 bytes
//! ```
use crate::config::{ID_CAPACITY, MAX_COURSES, MAX_SEATS, NAME_CAPACITY, PASSWORD_CAPACITY};
use crate::model::{Course, Faculty, Role, Student, User};
use crate::{RegistryError, Result};

/// A type that is stored as a fixed-size block in a flat file.
pub trait Record: Sized {
    /// human readable entity name, used in errors and logs
    const ENTITY: &'static str;

    /// size of one encoded block in bytes
    const SIZE: usize;

    /// the unique identifier of this record
    fn key(&self) -> &str;

    /// encodes this record into a block of exactly [`Record::SIZE`] bytes
    ///
    /// # Errors
    /// `FieldTooLong` if a string does not fit into its field
    fn encode(&self) -> Result<Vec<u8>>;

    /// decodes a block produced by [`Record::encode`]
    ///
    /// # Errors
    /// `CorruptRecord` if the block has the wrong size or invalid contents
    fn decode(block: &[u8]) -> Result<Self>;
}

struct BlockWriter {
    buf: Vec<u8>,
}

impl BlockWriter {
    fn new(size: usize) -> Self {
        BlockWriter {
            buf: Vec::with_capacity(size),
        }
    }

    fn put_str(&mut self, field: &'static str, value: &str, capacity: usize) -> Result<()> {
        let bytes = value.as_bytes();
        if bytes.contains(&0) {
            return Err(RegistryError::InvalidInput(format!(
                "{} contains a NUL byte",
                field
            )));
        }
        if bytes.len() + 1 > capacity {
            return Err(RegistryError::FieldTooLong {
                field,
                capacity,
                len: bytes.len(),
            });
        }
        self.buf.extend_from_slice(bytes);
        self.zeros(capacity - bytes.len());
        Ok(())
    }

    fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn zeros(&mut self, count: usize) {
        self.buf.resize(self.buf.len() + count, 0);
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

struct BlockReader<'a> {
    block: &'a [u8],
    pos: usize,
}

impl<'a> BlockReader<'a> {
    fn new<R: Record>(block: &'a [u8]) -> Result<Self> {
        if block.len() != R::SIZE {
            return Err(RegistryError::CorruptRecord(format!(
                "{} block is {} bytes, expected {}",
                R::ENTITY,
                block.len(),
                R::SIZE
            )));
        }
        Ok(BlockReader { block, pos: 0 })
    }

    fn take(&mut self, len: usize) -> &'a [u8] {
        let bytes = &self.block[self.pos..self.pos + len];
        self.pos += len;
        bytes
    }

    fn str(&mut self, field: &'static str, capacity: usize) -> Result<String> {
        let bytes = self.take(capacity);
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(capacity);
        std::str::from_utf8(&bytes[..end])
            .map(String::from)
            .map_err(|e| RegistryError::CorruptRecord(format!("{} is not utf-8: {}", field, e)))
    }

    fn u32(&mut self) -> u32 {
        let bytes = self.take(4);
        u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

impl Record for User {
    const ENTITY: &'static str = "user";
    const SIZE: usize = ID_CAPACITY + 4 + PASSWORD_CAPACITY;

    fn key(&self) -> &str {
        &self.id
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut w = BlockWriter::new(Self::SIZE);
        w.put_str("id", &self.id, ID_CAPACITY)?;
        w.put_u32(self.role.code());
        w.put_str("password", &self.password, PASSWORD_CAPACITY)?;
        Ok(w.finish())
    }

    fn decode(block: &[u8]) -> Result<Self> {
        let mut r = BlockReader::new::<Self>(block)?;
        let id = r.str("id", ID_CAPACITY)?;
        let code = r.u32();
        let role = Role::from_code(code)
            .ok_or_else(|| RegistryError::CorruptRecord(format!("unknown role code {}", code)))?;
        let password = r.str("password", PASSWORD_CAPACITY)?;
        Ok(User { id, role, password })
    }
}

impl Record for Student {
    const ENTITY: &'static str = "student";
    const SIZE: usize = ID_CAPACITY + NAME_CAPACITY + 4 + MAX_COURSES * ID_CAPACITY;

    fn key(&self) -> &str {
        &self.id
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut w = BlockWriter::new(Self::SIZE);
        w.put_str("id", &self.id, ID_CAPACITY)?;
        w.put_str("name", &self.name, NAME_CAPACITY)?;
        w.put_u32(self.active as u32);
        for index in 0..MAX_COURSES {
            match self.courses.get(index) {
                Some(course) => w.put_str("course id", course, ID_CAPACITY)?,
                None => w.zeros(ID_CAPACITY),
            }
        }
        Ok(w.finish())
    }

    fn decode(block: &[u8]) -> Result<Self> {
        let mut r = BlockReader::new::<Self>(block)?;
        let mut student = Student::new(r.str("id", ID_CAPACITY)?, r.str("name", NAME_CAPACITY)?);
        student.active = r.u32() != 0;
        for index in 0..MAX_COURSES {
            let course = r.str("course id", ID_CAPACITY)?;
            if !course.is_empty() {
                student.courses.set(index, course);
            }
        }
        Ok(student)
    }
}

impl Record for Faculty {
    const ENTITY: &'static str = "faculty";
    const SIZE: usize = ID_CAPACITY + NAME_CAPACITY;

    fn key(&self) -> &str {
        &self.id
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut w = BlockWriter::new(Self::SIZE);
        w.put_str("id", &self.id, ID_CAPACITY)?;
        w.put_str("name", &self.name, NAME_CAPACITY)?;
        Ok(w.finish())
    }

    fn decode(block: &[u8]) -> Result<Self> {
        let mut r = BlockReader::new::<Self>(block)?;
        Ok(Faculty {
            id: r.str("id", ID_CAPACITY)?,
            name: r.str("name", NAME_CAPACITY)?,
        })
    }
}

impl Record for Course {
    const ENTITY: &'static str = "course";
    const SIZE: usize = 2 * ID_CAPACITY + NAME_CAPACITY + 4 + 4 + MAX_SEATS * ID_CAPACITY;

    fn key(&self) -> &str {
        &self.id
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut w = BlockWriter::new(Self::SIZE);
        w.put_str("id", &self.id, ID_CAPACITY)?;
        w.put_str("name", &self.name, NAME_CAPACITY)?;
        w.put_str("faculty id", &self.faculty_id, ID_CAPACITY)?;
        w.put_u32(self.total_seats);
        w.put_u32(self.enrolled_count());
        for student in self.students.iter() {
            w.put_str("student id", student, ID_CAPACITY)?;
        }
        w.zeros((MAX_SEATS - self.students.len()) * ID_CAPACITY);
        Ok(w.finish())
    }

    fn decode(block: &[u8]) -> Result<Self> {
        let mut r = BlockReader::new::<Self>(block)?;
        let id = r.str("id", ID_CAPACITY)?;
        let name = r.str("name", NAME_CAPACITY)?;
        let faculty_id = r.str("faculty id", ID_CAPACITY)?;
        let total_seats = r.u32();
        let enrolled = r.u32() as usize;
        if enrolled > MAX_SEATS {
            return Err(RegistryError::CorruptRecord(format!(
                "course {} lists {} students, capacity is {}",
                id, enrolled, MAX_SEATS
            )));
        }

        let mut course = Course::new(id, name, faculty_id, total_seats);
        for _ in 0..enrolled {
            let student = r.str("student id", ID_CAPACITY)?;
            if student.is_empty() {
                return Err(RegistryError::CorruptRecord(format!(
                    "course {} has a hole in its enrollment list",
                    course.id
                )));
            }
            // cannot fail, enrolled <= capacity
            let _ = course.students.push(student);
        }
        Ok(course)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    #[test]
    fn record_sizes_match_layout() {
        assert_eq!(User::SIZE, 64);
        assert_eq!(Student::SIZE, 1064);
        assert_eq!(Faculty::SIZE, 60);
        assert_eq!(Course::SIZE, 1078);
        assert_eq!(User::new("u", Role::Admin, "p").encode().unwrap().len(), User::SIZE);
        assert_eq!(Course::new("c", "n", "f", 3).encode().unwrap().len(), Course::SIZE);
    }

    #[test]
    fn identifier_of_nine_chars_fits_ten_does_not() {
        assert!(Faculty::new("abcdefghi", "Dr. Who").encode().is_ok());
        match Faculty::new("abcdefghij", "Dr. Who").encode() {
            Err(RegistryError::FieldTooLong {
                field: "id",
                capacity: ID_CAPACITY,
                len: 10,
            }) => {}
            other => panic!("expected FieldTooLong, got {:?}", other),
        }
    }

    #[test]
    fn long_password_is_rejected() {
        let user = User::new("u1", Role::Student, "x".repeat(PASSWORD_CAPACITY));
        assert!(matches!(
            user.encode(),
            Err(RegistryError::FieldTooLong { field: "password", .. })
        ));
    }

    #[test]
    fn wrong_block_size_is_corrupt() {
        let block = Faculty::new("f1", "Ada").encode().unwrap();
        assert!(matches!(
            Faculty::decode(&block[..block.len() - 1]),
            Err(RegistryError::CorruptRecord(_))
        ));
        assert!(matches!(
            Student::decode(&block),
            Err(RegistryError::CorruptRecord(_))
        ));
    }

    #[test]
    fn unknown_role_code_is_corrupt() {
        let mut block = User::new("u1", Role::Faculty, "pw").encode().unwrap();
        block[ID_CAPACITY] = 9;
        assert!(matches!(User::decode(&block), Err(RegistryError::CorruptRecord(_))));
    }

    #[test]
    fn enrolled_count_past_capacity_is_corrupt() {
        let mut block = Course::new("c1", "Os", "f1", 5).encode().unwrap();
        let count_at = 2 * ID_CAPACITY + NAME_CAPACITY + 4;
        block[count_at..count_at + 4].copy_from_slice(&(MAX_SEATS as u32 + 1).to_le_bytes());
        assert!(matches!(Course::decode(&block), Err(RegistryError::CorruptRecord(_))));
    }

    #[test]
    fn student_slot_positions_survive() {
        let mut student = Student::new("s1", "John");
        student.courses.set(3, "c9");
        student.courses.set(MAX_COURSES - 1, "c1");
        let decoded = Student::decode(&student.encode().unwrap()).unwrap();
        assert_eq!(decoded.courses.get(3), Some("c9"));
        assert_eq!(decoded.courses.find_empty(), Some(0));
        assert_eq!(decoded, student);
    }

    fn id() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9]{1,9}"
    }

    fn name() -> impl Strategy<Value = String> {
        "[a-zA-Z .]{1,49}"
    }

    proptest! {
        #[test]
        fn user_round_trips(id in id(), password in "[ -~]{1,49}", code in 0u32..3) {
            let user = User::new(id, Role::from_code(code).unwrap(), password);
            prop_assert_eq!(User::decode(&user.encode().unwrap()).unwrap(), user);
        }

        #[test]
        fn student_round_trips(
            id in id(),
            name in name(),
            active in any::<bool>(),
            slots in vec(proptest::option::of(id()), MAX_COURSES),
        ) {
            let mut student = Student::new(id, name);
            student.active = active;
            for (index, slot) in slots.into_iter().enumerate() {
                if let Some(course) = slot {
                    student.courses.set(index, course);
                }
            }
            prop_assert_eq!(Student::decode(&student.encode().unwrap()).unwrap(), student);
        }

        #[test]
        fn course_round_trips(
            id in id(),
            name in name(),
            faculty in id(),
            seats in 1u32..=100,
            students in vec(id(), 0..=MAX_SEATS),
        ) {
            let mut course = Course::new(id, name, faculty, seats);
            for student in students {
                course.students.push(student).unwrap();
            }
            prop_assert_eq!(Course::decode(&course.encode().unwrap()).unwrap(), course);
        }

        #[test]
        fn faculty_round_trips(id in id(), name in name()) {
            let faculty = Faculty::new(id, name);
            prop_assert_eq!(Faculty::decode(&faculty.encode().unwrap()).unwrap(), faculty);
        }
    }
}
