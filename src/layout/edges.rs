use crate::geometry::Point;

/// Where the line from `center` toward `toward` leaves the `width × height`
/// box centered on `center`. If `toward` lies inside the box it is returned
/// unchanged.
pub fn boundary_point(center: Point, toward: Point, width: f32, height: f32) -> Point {
    let dx = toward.x - center.x;
    let dy = toward.y - center.y;
    if dx == 0.0 && dy == 0.0 {
        return center;
    }
    let tx = if dx != 0.0 {
        (width / 2.0) / dx.abs()
    } else {
        f32::INFINITY
    };
    let ty = if dy != 0.0 {
        (height / 2.0) / dy.abs()
    } else {
        f32::INFINITY
    };
    let t = tx.min(ty).min(1.0);
    Point::new(center.x + dx * t, center.y + dy * t)
}

/// Connector endpoints between two equally sized node boxes.
pub fn connector(parent: Point, child: Point, width: f32, height: f32) -> (Point, Point) {
    (
        boundary_point(parent, child, width, height),
        boundary_point(child, parent, width, height),
    )
}
