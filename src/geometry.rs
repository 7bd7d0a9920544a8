//! Decoding of geometry command streams (spec 4.3).
//!
//! The decoder walks the packed command/parameter integers of a feature and
//! reports structured events to a caller-supplied [`GeomHandler`]. It never
//! allocates and fails fast on the first malformation.

use crate::common::{GeomType, Point, RingType};
use crate::error::{Error, Result};
use crate::wire::{
    command_count, command_id, decode_zigzag32, PackedF64, PackedU32, COMMAND_CLOSE_PATH,
    COMMAND_LINE_TO, COMMAND_MOVE_TO, MAX_COMMAND_COUNT,
};

/// A geometry type together with the views of its command stream and, for
/// splines, its knot stream. Obtained from
/// [`Feature::geometry`](crate::read::Feature::geometry).
#[derive(Copy, Clone, Debug)]
pub struct Geometry<'t> {
    data: &'t [u8],
    knots: &'t [u8],
    geom_type: GeomType,
    dimensions: u32,
}

impl<'t> Geometry<'t> {
    pub(crate) fn new(
        data: &'t [u8],
        knots: &'t [u8],
        geom_type: GeomType,
        dimensions: u32,
    ) -> Geometry<'t> {
        Geometry {
            data,
            knots,
            geom_type,
            dimensions,
        }
    }

    /// The packed command stream.
    pub fn data(&self) -> &'t [u8] {
        self.data
    }

    /// The packed knot stream (empty unless the feature is a spline).
    pub fn knots(&self) -> &'t [u8] {
        self.knots
    }

    pub fn geom_type(&self) -> GeomType {
        self.geom_type
    }

    pub fn dimensions(&self) -> u32 {
        self.dimensions
    }
}

/// Receives decoding events. Every method has an empty default body, so
/// handlers only implement the group matching the geometry type they decode;
/// [`finish`](GeomHandler::finish) produces the value the decode functions
/// return.
pub trait GeomHandler {
    type Output;

    fn points_begin(&mut self, _count: u32) {}
    fn points_point(&mut self, _point: Point) {}
    fn points_end(&mut self) {}

    fn linestring_begin(&mut self, _count: u32) {}
    fn linestring_point(&mut self, _point: Point) {}
    fn linestring_end(&mut self) {}

    fn ring_begin(&mut self, _count: u32) {}
    fn ring_point(&mut self, _point: Point) {}
    fn ring_end(&mut self, _ring_type: RingType) {}

    fn controlpoints_begin(&mut self, _count: u32) {}
    fn controlpoints_point(&mut self, _point: Point) {}
    fn controlpoints_end(&mut self) {}

    fn knots_begin(&mut self, _count: u32) {}
    fn knots_value(&mut self, _value: f64) {}
    fn knots_end(&mut self) {}

    fn finish(self) -> Self::Output;
}

fn det(a: Point, b: Point) -> i64 {
    i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y)
}

struct GeometryDecoder<'t> {
    commands: PackedU32<'t>,
    knots: &'t [u8],
    cursor: Point,
    dimensions: u32,
    /// Set from a command integer and counted down by `next_point()`; must
    /// be 0 again before the next command is read.
    count: u32,
    /// Ceiling for any command count, derived from the remaining payload
    /// size so corrupt counts fail before a long decode loop.
    max_count: u32,
}

impl<'t> GeometryDecoder<'t> {
    fn new(geometry: &Geometry<'t>) -> GeometryDecoder<'t> {
        let max_count = (geometry.data.len() / 2).min(MAX_COMMAND_COUNT as usize) as u32;
        GeometryDecoder {
            commands: PackedU32::new(geometry.data),
            knots: geometry.knots,
            cursor: Point::default(),
            dimensions: geometry.dimensions,
            count: 0,
            max_count,
        }
    }

    fn done(&self) -> bool {
        self.commands.is_done()
    }

    fn next_command(&mut self, expected: u32) -> Result<bool> {
        debug_assert_eq!(self.count, 0);

        let command = match self.commands.next().transpose()? {
            None => return Ok(false),
            Some(c) => c,
        };

        let id = command_id(command);
        if id != expected {
            return Err(Error::Geometry(format!(
                "expected command {expected} but got {id}"
            )));
        }

        if expected == COMMAND_CLOSE_PATH {
            // spec 4.3.3.3 "A ClosePath command MUST have a command count of 1"
            if command_count(command) != 1 {
                return Err(Error::Geometry(
                    "ClosePath command count is not 1".to_string(),
                ));
            }
        } else {
            self.count = command_count(command);
            if self.count > self.max_count {
                return Err(Error::Geometry("command count too large".to_string()));
            }
        }

        Ok(true)
    }

    fn next_delta(&mut self) -> Result<i32> {
        match self.commands.next().transpose()? {
            Some(value) => Ok(decode_zigzag32(value)),
            None => Err(Error::Geometry("too few points in geometry".to_string())),
        }
    }

    fn next_point(&mut self) -> Result<Point> {
        debug_assert!(self.count > 0);

        let x = self.next_delta()?;
        let y = self.next_delta()?;
        self.cursor.x = (i64::from(self.cursor.x) + i64::from(x)) as i32;
        self.cursor.y = (i64::from(self.cursor.y) + i64::from(y)) as i32;
        if self.dimensions == 3 {
            let z = self.next_delta()?;
            self.cursor.z = (i64::from(self.cursor.z) + i64::from(z)) as i32;
        }

        self.count -= 1;

        Ok(self.cursor)
    }

    fn decode_point<H: GeomHandler>(mut self, mut handler: H) -> Result<H::Output> {
        // spec 4.3.4.2 "MUST consist of a single MoveTo command"
        if !self.next_command(COMMAND_MOVE_TO)? {
            return Err(Error::Geometry(
                "expected MoveTo command (spec 4.3.4.2)".to_string(),
            ));
        }

        // spec 4.3.4.2 "command count greater than 0"
        if self.count == 0 {
            return Err(Error::Geometry(
                "MoveTo command count is zero (spec 4.3.4.2)".to_string(),
            ));
        }

        handler.points_begin(self.count);
        while self.count > 0 {
            let point = self.next_point()?;
            handler.points_point(point);
        }

        // spec 4.3.4.2 "MUST consist of of a single ... command"
        if !self.done() {
            return Err(Error::Geometry(
                "additional data after end of geometry (spec 4.3.4.2)".to_string(),
            ));
        }

        handler.points_end();

        Ok(handler.finish())
    }

    fn decode_linestring<H: GeomHandler>(mut self, mut handler: H) -> Result<H::Output> {
        // spec 4.3.4.3 "1. A MoveTo command"
        while self.next_command(COMMAND_MOVE_TO)? {
            // spec 4.3.4.3 "with a command count of 1"
            if self.count != 1 {
                return Err(Error::Geometry(
                    "MoveTo command count is not 1 (spec 4.3.4.3)".to_string(),
                ));
            }

            let first_point = self.next_point()?;

            // spec 4.3.4.3 "2. A LineTo command"
            if !self.next_command(COMMAND_LINE_TO)? {
                return Err(Error::Geometry(
                    "expected LineTo command (spec 4.3.4.3)".to_string(),
                ));
            }

            // spec 4.3.4.3 "with a command count greater than 0"
            if self.count == 0 {
                return Err(Error::Geometry(
                    "LineTo command count is zero (spec 4.3.4.3)".to_string(),
                ));
            }

            handler.linestring_begin(self.count + 1);
            handler.linestring_point(first_point);
            while self.count > 0 {
                let point = self.next_point()?;
                handler.linestring_point(point);
            }
            handler.linestring_end();
        }

        Ok(handler.finish())
    }

    fn decode_polygon<H: GeomHandler>(mut self, mut handler: H) -> Result<H::Output> {
        // spec 4.3.4.4 "1. A MoveTo command"
        while self.next_command(COMMAND_MOVE_TO)? {
            // spec 4.3.4.4 "with a command count of 1"
            if self.count != 1 {
                return Err(Error::Geometry(
                    "MoveTo command count is not 1 (spec 4.3.4.4)".to_string(),
                ));
            }

            let start_point = self.next_point()?;
            let mut last_point = start_point;
            let mut sum = 0i64;

            // spec 4.3.4.4 "2. A LineTo command"
            if !self.next_command(COMMAND_LINE_TO)? {
                return Err(Error::Geometry(
                    "expected LineTo command (spec 4.3.4.4)".to_string(),
                ));
            }

            handler.ring_begin(self.count + 2);
            handler.ring_point(start_point);

            while self.count > 0 {
                let point = self.next_point()?;
                sum += det(last_point, point);
                last_point = point;
                handler.ring_point(point);
            }

            // spec 4.3.4.4 "3. A ClosePath command"
            if !self.next_command(COMMAND_CLOSE_PATH)? {
                return Err(Error::Geometry(
                    "expected ClosePath command (spec 4.3.4.4)".to_string(),
                ));
            }

            sum += det(last_point, start_point);

            // the ring is closed for the handler by repeating its start point
            handler.ring_point(start_point);
            handler.ring_end(if sum > 0 {
                RingType::Outer
            } else if sum < 0 {
                RingType::Inner
            } else {
                RingType::Invalid
            });
        }

        Ok(handler.finish())
    }

    fn decode_spline<H: GeomHandler>(mut self, mut handler: H) -> Result<H::Output> {
        if self.next_command(COMMAND_MOVE_TO)? {
            // spec 4.3.4.3 "with a command count of 1"
            if self.count != 1 {
                return Err(Error::Geometry(
                    "MoveTo command count is not 1 (spec 4.3.4.3)".to_string(),
                ));
            }

            let first_point = self.next_point()?;

            // spec 4.3.4.3 "2. A LineTo command"
            if !self.next_command(COMMAND_LINE_TO)? {
                return Err(Error::Geometry(
                    "expected LineTo command (spec 4.3.4.3)".to_string(),
                ));
            }

            // spec 4.3.4.3 "with a command count greater than 0"
            if self.count == 0 {
                return Err(Error::Geometry(
                    "LineTo command count is zero (spec 4.3.4.3)".to_string(),
                ));
            }

            handler.controlpoints_begin(self.count + 1);
            handler.controlpoints_point(first_point);
            while self.count > 0 {
                let point = self.next_point()?;
                handler.controlpoints_point(point);
            }
            handler.controlpoints_end();

            let knots = PackedF64::new(self.knots)?;
            handler.knots_begin(knots.remaining() as u32);
            for value in knots {
                handler.knots_value(value);
            }
            handler.knots_end();
        }

        if !self.done() {
            return Err(Error::Geometry(
                "additional data after end of geometry (spec 4.3.4.2)".to_string(),
            ));
        }

        Ok(handler.finish())
    }
}

/// Decodes a point geometry.
pub fn decode_point_geometry<H: GeomHandler>(
    geometry: &Geometry<'_>,
    handler: H,
) -> Result<H::Output> {
    debug_assert_eq!(geometry.geom_type(), GeomType::Point);
    GeometryDecoder::new(geometry).decode_point(handler)
}

/// Decodes a linestring geometry.
pub fn decode_linestring_geometry<H: GeomHandler>(
    geometry: &Geometry<'_>,
    handler: H,
) -> Result<H::Output> {
    debug_assert_eq!(geometry.geom_type(), GeomType::Linestring);
    GeometryDecoder::new(geometry).decode_linestring(handler)
}

/// Decodes a polygon geometry.
pub fn decode_polygon_geometry<H: GeomHandler>(
    geometry: &Geometry<'_>,
    handler: H,
) -> Result<H::Output> {
    debug_assert_eq!(geometry.geom_type(), GeomType::Polygon);
    GeometryDecoder::new(geometry).decode_polygon(handler)
}

/// Decodes a spline geometry: control point events over the command
/// stream, then knot events over the knot stream.
pub fn decode_spline_geometry<H: GeomHandler>(
    geometry: &Geometry<'_>,
    handler: H,
) -> Result<H::Output> {
    debug_assert_eq!(geometry.geom_type(), GeomType::Spline);
    GeometryDecoder::new(geometry).decode_spline(handler)
}

/// Decodes a geometry of any type, dispatching on
/// [`Geometry::geom_type`].
pub fn decode_geometry<H: GeomHandler>(geometry: &Geometry<'_>, handler: H) -> Result<H::Output> {
    let decoder = GeometryDecoder::new(geometry);
    match geometry.geom_type() {
        GeomType::Point => decoder.decode_point(handler),
        GeomType::Linestring => decoder.decode_linestring(handler),
        GeomType::Polygon => decoder.decode_polygon(handler),
        GeomType::Spline => decoder.decode_spline(handler),
        GeomType::Unknown => Err(Error::Geometry("unknown geometry type".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{command_integer, emit_varint};

    fn geometry<'a>(commands: &[u32], buf: &'a mut Vec<u8>, geom_type: GeomType) -> Geometry<'a> {
        for c in commands {
            emit_varint(buf, u64::from(*c));
        }
        Geometry::new(buf, &[], geom_type, 2)
    }

    fn spline_geometry<'a>(
        commands: &[u32],
        knots: &[f64],
        buf: &'a mut Vec<u8>,
        knots_buf: &'a mut Vec<u8>,
    ) -> Geometry<'a> {
        for c in commands {
            emit_varint(buf, u64::from(*c));
        }
        for k in knots {
            knots_buf.extend_from_slice(&k.to_le_bytes());
        }
        Geometry::new(buf, knots_buf, GeomType::Spline, 2)
    }

    #[derive(Default)]
    struct PointHandler {
        data: Vec<Point>,
    }

    impl GeomHandler for PointHandler {
        type Output = Vec<Point>;

        fn points_point(&mut self, point: Point) {
            self.data.push(point);
        }

        fn finish(self) -> Vec<Point> {
            self.data
        }
    }

    #[derive(Default)]
    struct LinestringHandler {
        data: Vec<Vec<Point>>,
    }

    impl GeomHandler for LinestringHandler {
        type Output = Vec<Vec<Point>>;

        fn linestring_begin(&mut self, count: u32) {
            self.data.push(Vec::with_capacity(count as usize));
        }

        fn linestring_point(&mut self, point: Point) {
            self.data.last_mut().unwrap().push(point);
        }

        fn finish(self) -> Vec<Vec<Point>> {
            self.data
        }
    }

    #[derive(Default)]
    struct PolygonHandler {
        rings: Vec<(Vec<Point>, Option<RingType>)>,
    }

    impl GeomHandler for PolygonHandler {
        type Output = Vec<(Vec<Point>, Option<RingType>)>;

        fn ring_begin(&mut self, count: u32) {
            self.rings.push((Vec::with_capacity(count as usize), None));
        }

        fn ring_point(&mut self, point: Point) {
            self.rings.last_mut().unwrap().0.push(point);
        }

        fn ring_end(&mut self, ring_type: RingType) {
            self.rings.last_mut().unwrap().1 = Some(ring_type);
        }

        fn finish(self) -> Self::Output {
            self.rings
        }
    }

    /// Counts events the way the original vtzero test handler does: the
    /// final sum proves exactly which callbacks ran how often.
    #[derive(Default)]
    struct CountingSplineHandler {
        value: i64,
    }

    impl GeomHandler for CountingSplineHandler {
        type Output = i64;

        fn controlpoints_begin(&mut self, _count: u32) {
            self.value += 1;
        }

        fn controlpoints_point(&mut self, _point: Point) {
            self.value += 100;
        }

        fn controlpoints_end(&mut self) {
            self.value += 10000;
        }

        fn knots_begin(&mut self, _count: u32) {
            self.value += 1;
        }

        fn knots_value(&mut self, _value: f64) {
            self.value += 2;
        }

        fn knots_end(&mut self) {
            self.value += 200;
        }

        fn finish(self) -> i64 {
            self.value
        }
    }

    #[test]
    fn point() {
        let mut buf = Vec::new();
        let g = geometry(&[9, 50, 34], &mut buf, GeomType::Point);
        let points = decode_point_geometry(&g, PointHandler::default()).unwrap();
        assert_eq!(points, vec![Point::new(25, 17)]);
    }

    #[test]
    fn multipoint() {
        // two points relative to each other
        let mut buf = Vec::new();
        let g = geometry(
            &[command_integer(1, 2), 10, 14, 3, 9],
            &mut buf,
            GeomType::Point,
        );
        let points = decode_point_geometry(&g, PointHandler::default()).unwrap();
        assert_eq!(points, vec![Point::new(5, 7), Point::new(3, 2)]);
    }

    #[test]
    fn point_with_trailing_data() {
        let mut buf = Vec::new();
        let g = geometry(&[9, 50, 34, 9, 50, 34], &mut buf, GeomType::Point);
        let err = decode_point_geometry(&g, PointHandler::default()).unwrap_err();
        assert_eq!(
            err,
            Error::Geometry("additional data after end of geometry (spec 4.3.4.2)".to_string())
        );
    }

    #[test]
    fn point_with_zero_count() {
        let mut buf = Vec::new();
        let g = geometry(&[command_integer(1, 0)], &mut buf, GeomType::Point);
        assert!(matches!(
            decode_point_geometry(&g, PointHandler::default()),
            Err(Error::Geometry(_))
        ));
    }

    #[test]
    fn point_with_empty_stream() {
        let g = Geometry::new(&[], &[], GeomType::Point, 2);
        let err = decode_point_geometry(&g, PointHandler::default()).unwrap_err();
        assert_eq!(
            err,
            Error::Geometry("expected MoveTo command (spec 4.3.4.2)".to_string())
        );
    }

    #[test]
    fn point_with_missing_parameters() {
        let mut buf = Vec::new();
        let g = geometry(&[9, 50], &mut buf, GeomType::Point);
        let err = decode_point_geometry(&g, PointHandler::default()).unwrap_err();
        assert_eq!(err, Error::Geometry("too few points in geometry".to_string()));
    }

    #[test]
    fn linestring() {
        let mut buf = Vec::new();
        let g = geometry(&[9, 4, 4, 18, 0, 16, 16, 0], &mut buf, GeomType::Linestring);
        let lines = decode_linestring_geometry(&g, LinestringHandler::default()).unwrap();
        assert_eq!(
            lines,
            vec![vec![Point::new(2, 2), Point::new(2, 10), Point::new(10, 10)]]
        );
    }

    #[test]
    fn multilinestring_cursor_persists_between_strands() {
        let mut buf = Vec::new();
        let g = geometry(
            &[9, 4, 4, 18, 0, 16, 16, 0, 9, 17, 17, 10, 4, 8],
            &mut buf,
            GeomType::Linestring,
        );
        let lines = decode_linestring_geometry(&g, LinestringHandler::default()).unwrap();
        assert_eq!(
            lines,
            vec![
                vec![Point::new(2, 2), Point::new(2, 10), Point::new(10, 10)],
                vec![Point::new(1, 1), Point::new(3, 5)],
            ]
        );
    }

    #[test]
    fn linestring_without_lineto() {
        let mut buf = Vec::new();
        let g = geometry(
            &[command_integer(1, 1), 3, 4, command_integer(1, 1)],
            &mut buf,
            GeomType::Linestring,
        );
        let err = decode_linestring_geometry(&g, LinestringHandler::default()).unwrap_err();
        assert_eq!(err, Error::Geometry("expected command 2 but got 1".to_string()));
    }

    #[test]
    fn linestring_with_moveto_count_two() {
        let mut buf = Vec::new();
        let g = geometry(
            &[command_integer(1, 2), 10, 20, 20, 10],
            &mut buf,
            GeomType::Linestring,
        );
        let err = decode_linestring_geometry(&g, LinestringHandler::default()).unwrap_err();
        assert_eq!(
            err,
            Error::Geometry("MoveTo command count is not 1 (spec 4.3.4.3)".to_string())
        );
    }

    #[test]
    fn linestring_with_lineto_count_zero() {
        let mut buf = Vec::new();
        let g = geometry(
            &[command_integer(1, 1), 3, 4, command_integer(2, 0)],
            &mut buf,
            GeomType::Linestring,
        );
        let err = decode_linestring_geometry(&g, LinestringHandler::default()).unwrap_err();
        assert_eq!(
            err,
            Error::Geometry("LineTo command count is zero (spec 4.3.4.3)".to_string())
        );
    }

    #[test]
    fn empty_linestring_stream_is_fine() {
        let g = Geometry::new(&[], &[], GeomType::Linestring, 2);
        let lines = decode_linestring_geometry(&g, LinestringHandler::default()).unwrap();
        assert!(lines.is_empty());
    }

    #[test]
    fn polygon_outer_ring() {
        let mut buf = Vec::new();
        let g = geometry(
            &[9, 6, 12, 18, 10, 12, 24, 44, 15],
            &mut buf,
            GeomType::Polygon,
        );
        let rings = decode_polygon_geometry(&g, PolygonHandler::default()).unwrap();
        assert_eq!(rings.len(), 1);
        let (points, ring_type) = &rings[0];
        assert_eq!(
            *points,
            vec![
                Point::new(3, 6),
                Point::new(8, 12),
                Point::new(20, 34),
                Point::new(3, 6),
            ]
        );
        assert_eq!(*ring_type, Some(RingType::Outer));
    }

    #[test]
    fn polygon_final_point_repeats_first() {
        let mut buf = Vec::new();
        let g = geometry(
            &[9, 6, 12, 18, 10, 12, 24, 44, 15],
            &mut buf,
            GeomType::Polygon,
        );
        let rings = decode_polygon_geometry(&g, PolygonHandler::default()).unwrap();
        for (points, _) in &rings {
            assert_eq!(points.first(), points.last());
        }
    }

    #[test]
    fn multipolygon_with_inner_ring() {
        // outer square, second outer square, inner ring inside it
        let commands = [
            9, 0, 0, 26, 20, 0, 0, 20, 19, 0, 15, // (0,0)..(0,10) outer
            9, 22, 2, 26, 18, 0, 0, 18, 17, 0, 15, // (11,11)..(11,20) outer
            9, 4, 13, 26, 0, 8, 8, 0, 0, 7, 15, // (13,13)..(17,13) inner
        ];
        let mut buf = Vec::new();
        let g = geometry(&commands, &mut buf, GeomType::Polygon);
        let rings = decode_polygon_geometry(&g, PolygonHandler::default()).unwrap();
        assert_eq!(rings.len(), 3);
        assert_eq!(rings[0].1, Some(RingType::Outer));
        assert_eq!(rings[1].1, Some(RingType::Outer));
        assert_eq!(rings[2].1, Some(RingType::Inner));
        assert_eq!(
            rings[2].0,
            vec![
                Point::new(13, 13),
                Point::new(13, 17),
                Point::new(17, 17),
                Point::new(17, 13),
                Point::new(13, 13),
            ]
        );
    }

    #[test]
    fn degenerate_ring_is_invalid() {
        // all three points on one line, area 0
        let mut buf = Vec::new();
        let g = geometry(
            &[9, 0, 0, 18, 2, 2, 2, 2, 15],
            &mut buf,
            GeomType::Polygon,
        );
        let rings = decode_polygon_geometry(&g, PolygonHandler::default()).unwrap();
        assert_eq!(rings[0].1, Some(RingType::Invalid));
    }

    #[test]
    fn polygon_without_closepath() {
        let mut buf = Vec::new();
        let g = geometry(&[9, 6, 12, 18, 10, 12, 24, 44], &mut buf, GeomType::Polygon);
        assert!(matches!(
            decode_polygon_geometry(&g, PolygonHandler::default()),
            Err(Error::Geometry(_))
        ));
    }

    #[test]
    fn closepath_count_must_be_one() {
        let mut buf = Vec::new();
        let g = geometry(
            &[9, 6, 12, 18, 10, 12, 24, 44, command_integer(7, 2)],
            &mut buf,
            GeomType::Polygon,
        );
        let err = decode_polygon_geometry(&g, PolygonHandler::default()).unwrap_err();
        assert_eq!(err, Error::Geometry("ClosePath command count is not 1".to_string()));
    }

    #[test]
    fn stream_starting_with_closepath() {
        let mut buf = Vec::new();
        let g = geometry(&[15], &mut buf, GeomType::Polygon);
        let err = decode_polygon_geometry(&g, PolygonHandler::default()).unwrap_err();
        assert_eq!(err, Error::Geometry("expected command 1 but got 7".to_string()));
    }

    #[test]
    fn command_count_exceeding_payload_bound() {
        // MoveTo claiming 100 points in a 3-word stream
        let mut buf = Vec::new();
        let g = geometry(&[command_integer(1, 100), 50, 34], &mut buf, GeomType::Point);
        let err = decode_point_geometry(&g, PointHandler::default()).unwrap_err();
        assert_eq!(err, Error::Geometry("command count too large".to_string()));
    }

    #[test]
    fn spline() {
        let mut buf = Vec::new();
        let mut knots_buf = Vec::new();
        let g = spline_geometry(
            &[9, 4, 4, 18, 0, 16, 16, 0],
            &[0.0, 0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 1.0, 1.0],
            &mut buf,
            &mut knots_buf,
        );
        // 1 begin + 3 points + 1 end + knots begin/10 values/end
        assert_eq!(
            decode_spline_geometry(&g, CountingSplineHandler::default()).unwrap(),
            10522
        );
    }

    #[test]
    fn empty_spline_stream_is_fine() {
        let g = Geometry::new(&[], &[], GeomType::Spline, 2);
        assert_eq!(
            decode_spline_geometry(&g, CountingSplineHandler::default()).unwrap(),
            0
        );
    }

    #[test]
    fn spline_from_point_commands() {
        let mut buf = Vec::new();
        let mut knots_buf = Vec::new();
        let g = spline_geometry(&[9, 50, 34], &[1.0; 4], &mut buf, &mut knots_buf);
        let err = decode_spline_geometry(&g, CountingSplineHandler::default()).unwrap_err();
        assert_eq!(
            err,
            Error::Geometry("expected LineTo command (spec 4.3.4.3)".to_string())
        );
    }

    #[test]
    fn spline_from_polygon_commands() {
        let mut buf = Vec::new();
        let mut knots_buf = Vec::new();
        let g = spline_geometry(
            &[9, 6, 12, 18, 10, 12, 24, 44, 15],
            &[1.0; 4],
            &mut buf,
            &mut knots_buf,
        );
        let err = decode_spline_geometry(&g, CountingSplineHandler::default()).unwrap_err();
        assert_eq!(
            err,
            Error::Geometry("additional data after end of geometry (spec 4.3.4.2)".to_string())
        );
    }

    #[test]
    fn decode_geometry_dispatch() {
        let mut buf = Vec::new();
        let g = geometry(&[9, 50, 34], &mut buf, GeomType::Point);
        assert_eq!(
            decode_geometry(&g, PointHandler::default()).unwrap(),
            vec![Point::new(25, 17)]
        );

        let g = Geometry::new(&[], &[], GeomType::Unknown, 2);
        assert_eq!(
            decode_geometry(&g, PointHandler::default()).unwrap_err(),
            Error::Geometry("unknown geometry type".to_string())
        );
    }

    #[test]
    fn three_dimensional_point() {
        let mut buf = Vec::new();
        for c in [command_integer(1, 1), 50, 34, 6] {
            emit_varint(&mut buf, u64::from(c));
        }
        let g = Geometry::new(&buf, &[], GeomType::Point, 3);
        let points = decode_point_geometry(&g, PointHandler::default()).unwrap();
        assert_eq!(points, vec![Point::new_3d(25, 17, 3)]);
    }
}
